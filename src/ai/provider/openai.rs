//! OpenAI API Provider
//!
//! Vision-capable provider using OpenAI's Chat Completions API. The image is
//! sent inline as a base64 data URL at low detail.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmRequest, LlmResponse, ResponseMetadata,
    ResponseTiming, TokenUsage,
};
use crate::config::LlmConfig;
use crate::types::{MonitorError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const PROVIDER_NAME: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                MonitorError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MonitorError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key.to_string()),
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let mut parts = vec![ContentPart::Text {
            text: request.prompt.clone(),
        }];

        if let Some(image) = &request.image {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", image.mime, BASE64.encode(&image.bytes)),
                    detail: "low",
                },
            });
        }

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(parts),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse> {
        info!(
            "Generating with OpenAI (model: {}, image: {})",
            self.model,
            request.image.is_some()
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let category = if e.is_timeout() || e.is_connect() {
                    ErrorCategory::Network
                } else {
                    ErrorClassifier::classify(&e.to_string(), PROVIDER_NAME).category
                };
                LlmError::with_provider(category, format!("OpenAI request failed: {}", e), PROVIDER_NAME)
            })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("OpenAI API error ({}): {}", status, body),
                PROVIDER_NAME,
            )
            .into());
        }

        // An undecodable envelope is a transport fault, not bad model output
        let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::with_provider(
                ErrorCategory::Transient,
                format!("Failed to decode OpenAI response: {}", e),
                PROVIDER_NAME,
            )
        })?;

        let usage = response_body
            .usage
            .map(|u| {
                TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens)
                    .with_reported_total(u.total_tokens)
            })
            .unwrap_or_default();

        let content = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                LlmError::with_provider(
                    ErrorCategory::EmptyResponse,
                    "No content in OpenAI response",
                    PROVIDER_NAME,
                )
            })?;

        debug!(
            tokens = usage.total().get(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Received response from OpenAI"
        );

        Ok(LlmResponse {
            content,
            usage,
            timing: ResponseTiming::from_duration(elapsed),
            metadata: ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER_NAME.to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ImageAttachment;

    fn provider() -> OpenAiProvider {
        provider_at("http://localhost:9/v1/")
    }

    fn provider_at(api_base: &str) -> OpenAiProvider {
        OpenAiProvider::new(&LlmConfig {
            api_key: Some("sk-test".to_string()),
            api_base: Some(api_base.to_string()),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    fn request() -> LlmRequest {
        LlmRequest {
            system: "sys".to_string(),
            prompt: "reading".to_string(),
            image: None,
        }
    }

    #[test]
    fn test_request_shape_with_image() {
        let request = LlmRequest {
            system: "sys".to_string(),
            prompt: "reading".to_string(),
            image: Some(ImageAttachment {
                bytes: vec![0xff, 0xd8, 0xff],
                mime: "image/jpeg".to_string(),
            }),
        };
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-5-nano");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"], "sys");

        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["detail"], "low");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_request_without_image_is_text_only() {
        let request = LlmRequest {
            system: "sys".to_string(),
            prompt: "reading".to_string(),
            image: None,
        };
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();
        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        assert_eq!(provider().api_base, "http://localhost:9/v1");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn test_usage_decoding() {
        let body: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "{}"}}],
            "usage": {"prompt_tokens": 80, "completion_tokens": 20, "total_tokens": 140}
        }))
        .unwrap();
        let usage = body.usage.unwrap();
        assert_eq!(usage.total_tokens, Some(140));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let err = provider().generate(&request()).await.unwrap_err();
        match err {
            MonitorError::Llm(e) => assert_eq!(e.category, ErrorCategory::Network),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_envelope_is_transient() {
        let app = axum::Router::new().route(
            "/v1/chat/completions",
            axum::routing::post(|| async { "<html>upstream proxy page</html>" }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = provider_at(&format!("http://{}/v1", addr))
            .generate(&request())
            .await
            .unwrap_err();
        match err {
            MonitorError::Llm(e) => assert_eq!(e.category, ErrorCategory::Transient),
            other => panic!("unexpected error: {other}"),
        }
    }
}
