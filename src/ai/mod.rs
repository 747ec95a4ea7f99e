//! AI Integration Layer
//!
//! Vision-capable inference for plant-health assessment: provider
//! abstraction, prompt construction, output parsing, cost estimation.

pub mod cost;
pub mod inference;
pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod validation;

pub use cost::{Pricing, calculate_cost, format_cost};
pub use inference::{InferenceAdapter, InferenceOutcome, degraded_result};
pub use metrics::{MetricsCollector, MetricsSummary, SharedMetrics, create_shared_metrics};
pub use prompt::{AssessmentPrompt, PromptBuilder, PromptSection};
pub use provider::{
    ErrorCategory, ErrorClassifier, ImageAttachment, LlmError, LlmProvider, LlmRequest,
    LlmResponse, OpenAiProvider, ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage,
    create_provider,
};
pub use validation::{JsonRepairer, ModelAssessment, ParseOutcome, ResponseValidator};
