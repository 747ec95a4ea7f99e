//! LLM Provider Abstraction
//!
//! Defines the `LlmProvider` trait: submit text plus an optional image, get
//! back raw text and token usage. Parsing the text is the caller's job, so
//! providers never decide whether an answer is acceptable.

#[cfg(test)]
pub mod mock;
mod openai;

pub use openai::OpenAiProvider;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{MonitorError, Result, TokenCount};

// =============================================================================
// Request
// =============================================================================

/// Image sent alongside the prompt
#[derive(Clone)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl std::fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("bytes", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

/// One inference request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Fixed system instruction
    pub system: String,
    /// Per-reading user prompt
    pub prompt: String,
    pub image: Option<ImageAttachment>,
}

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Raw model output with usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, unparsed
    pub content: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

/// Token usage metrics for cost tracking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt + image)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
    /// Total as reported by the endpoint (may include reasoning tokens)
    pub reported_total: Option<u32>,
}

impl TokenUsage {
    /// Total tokens, preferring the endpoint's own total
    pub fn total(&self) -> TokenCount {
        let total = self
            .reported_total
            .unwrap_or(self.input_tokens + self.output_tokens);
        TokenCount::from(total)
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
            reported_total: None,
        }
    }

    pub fn with_reported_total(mut self, total: Option<u32>) -> Self {
        self.reported_total = total;
        self
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared LLM provider type for concurrent access.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// Vision-capable text generation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Submit one request; errors carry an `ErrorCategory` where known
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is reachable with the configured credential
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration.
///
/// Fails with `MonitorError::Config` when no credential is configured.
pub fn create_provider(config: &LlmConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        _ => Err(MonitorError::Config(format!(
            "Unknown provider: {}. Supported: openai",
            config.provider
        ))),
    }
}
