//! Scripted provider for tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    ErrorCategory, LlmError, LlmProvider, LlmRequest, LlmResponse, ResponseMetadata,
    ResponseTiming, TokenUsage,
};
use crate::types::Result;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    Text { content: String, tokens: u32 },
    Fail(ErrorCategory),
}

/// Replays scripted replies in order; the last one repeats
#[derive(Debug)]
pub struct MockProvider {
    replies: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
    saw_image: Mutex<Vec<bool>>,
}

impl MockProvider {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            saw_image: Mutex::new(Vec::new()),
        }
    }

    pub fn text(content: &str, tokens: u32) -> Self {
        Self::new(vec![MockReply::Text {
            content: content.to_string(),
            tokens,
        }])
    }

    pub fn failing(category: ErrorCategory) -> Self {
        Self::new(vec![MockReply::Fail(category)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether each call carried an image, in call order
    pub fn images_seen(&self) -> Vec<bool> {
        self.saw_image.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.saw_image.lock().unwrap().push(request.image.is_some());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        };

        match reply {
            Some(MockReply::Text { content, tokens }) => Ok(LlmResponse {
                content,
                usage: TokenUsage::from_openai(tokens * 7 / 10, tokens - tokens * 7 / 10),
                timing: ResponseTiming { total_ms: 5 },
                metadata: ResponseMetadata {
                    model: "mock-model".to_string(),
                    provider: "mock".to_string(),
                },
            }),
            Some(MockReply::Fail(category)) => {
                Err(LlmError::with_provider(category, "scripted failure", "mock").into())
            }
            None => Err(LlmError::new(ErrorCategory::Unknown, "no scripted reply").into()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
