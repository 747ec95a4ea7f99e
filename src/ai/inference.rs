//! AI Inference Adapter
//!
//! Builds the prompt, calls the provider once, runs the two-stage JSON parse
//! and attaches usage. Never returns an error for inference failures: the
//! outcome is tagged so the caller decides whether to fall back.

use tracing::{info, warn};

use crate::ai::cost::Pricing;
use crate::ai::metrics::SharedMetrics;
use crate::ai::prompt::AssessmentPrompt;
use crate::ai::provider::{ImageAttachment, LlmRequest, SharedProvider, create_provider};
use crate::ai::validation::{JsonRepairer, ParseOutcome, ResponseValidator};
use crate::config::LlmConfig;
use crate::constants::result as result_constants;
use crate::types::{
    AnalysisResult, ErrorCategory, ErrorClassifier, HistoricalContext, LlmError, Result,
    SensorReading,
};

/// Result of one inference attempt
#[derive(Debug, Clone)]
pub enum InferenceOutcome {
    /// The model answered with an acceptable JSON object
    Success {
        result: AnalysisResult,
        parse: ParseOutcome,
    },
    /// The call or the parse failed; `degraded` is the fixed-shape
    /// uncertain result describing the failure. `billed` is set when the
    /// request reached the model and counts against the daily limit.
    Failed {
        failure: LlmError,
        degraded: AnalysisResult,
        billed: bool,
    },
}

impl InferenceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn result(&self) -> &AnalysisResult {
        match self {
            Self::Success { result, .. } => result,
            Self::Failed { degraded, .. } => degraded,
        }
    }
}

pub struct InferenceAdapter {
    provider: SharedProvider,
    repairer: JsonRepairer,
    validator: ResponseValidator,
    pricing: Pricing,
    metrics: SharedMetrics,
    system_prompt: String,
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("pricing", &self.pricing)
            .finish()
    }
}

impl InferenceAdapter {
    /// Fails with `MonitorError::Config` when no credential is configured
    pub fn from_config(config: &LlmConfig, metrics: SharedMetrics) -> Result<Self> {
        let provider = create_provider(config)?;
        Ok(Self::with_provider(provider, metrics))
    }

    pub fn with_provider(provider: SharedProvider, metrics: SharedMetrics) -> Self {
        Self {
            provider,
            repairer: JsonRepairer::new(),
            validator: ResponseValidator::new(),
            pricing: Pricing::default(),
            metrics,
            system_prompt: AssessmentPrompt::system(),
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// Assess one reading. Any failure is folded into `InferenceOutcome::Failed`.
    pub async fn analyze(
        &self,
        reading: &SensorReading,
        history: &HistoricalContext,
        image: Option<ImageAttachment>,
    ) -> InferenceOutcome {
        let timestamp = reading.timestamp();
        let has_image = image.is_some();
        let request = LlmRequest {
            system: self.system_prompt.clone(),
            prompt: AssessmentPrompt::user(timestamp, &reading.snapshot(), history, has_image),
            image,
        };

        info!(
            event = "inference_start",
            model = self.provider.model(),
            has_image,
            "Requesting plant assessment"
        );

        let response = match self.provider.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                let failure = ErrorClassifier::classify_monitor_error(&e, self.provider.name());
                let billed = failure.category == ErrorCategory::EmptyResponse;
                return self.failed(failure, reading, billed);
            }
        };

        let assessment = self
            .repairer
            .parse(&response.content)
            .and_then(|(value, parse)| Ok((self.validator.validate(&value)?, parse)));

        let (assessment, parse) = match assessment {
            Ok(parsed) => parsed,
            Err(e) => {
                let failure = ErrorClassifier::classify_monitor_error(&e, self.provider.name());
                return self.failed(failure, reading, true);
            }
        };

        self.metrics.record_success(&response, parse);

        let tokens = response.usage.total();
        let result = AnalysisResult {
            status: assessment.status,
            confidence: assessment.confidence,
            reasoning: assessment.reasoning,
            visual_assessment: assessment.visual_assessment,
            signals_agree: assessment.signals_agree,
            primary_concern: assessment.primary_concern,
            recommended_action: assessment.recommended_action,
            timestamp,
            tokens_used: tokens.get(),
            cost: self.pricing.calculate_cost(tokens),
        }
        .finalize();

        info!(
            event = "inference_end",
            model = self.provider.model(),
            tokens_used = result.tokens_used,
            recovered = parse == ParseOutcome::Recovered,
            "Plant assessment received"
        );

        InferenceOutcome::Success { result, parse }
    }

    fn failed(
        &self,
        failure: LlmError,
        reading: &SensorReading,
        billed: bool,
    ) -> InferenceOutcome {
        warn!(
            event = "inference_failed",
            category = %failure.category,
            billed,
            error = %failure.message,
            "Inference failed"
        );
        self.metrics.record_failure(failure.category);

        let degraded = degraded_result(failure.category, reading);
        InferenceOutcome::Failed {
            failure,
            degraded,
            billed,
        }
    }
}

/// Fixed-shape uncertain result for a failed inference
pub fn degraded_result(category: ErrorCategory, reading: &SensorReading) -> AnalysisResult {
    let result = if category == ErrorCategory::ParseError {
        AnalysisResult::uncertain(
            result_constants::PARSE_FAILURE_CONFIDENCE,
            "AI response parsing failed; using threshold fallback.",
            "Manual inspection required",
            reading.timestamp(),
        )
    } else {
        AnalysisResult::uncertain(
            result_constants::TRANSPORT_FAILURE_CONFIDENCE,
            format!("AI unavailable ({}); using threshold fallback.", category),
            "Check system logs and retry",
            reading.timestamp(),
        )
    };
    result.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::metrics::create_shared_metrics;
    use crate::ai::provider::mock::MockProvider;
    use crate::types::{AnalysisStatus, PrimaryConcern, parse_timestamp};
    use std::sync::Arc;

    fn reading() -> SensorReading {
        SensorReading::new(
            parse_timestamp("2025-06-01T14:00:00Z").unwrap(),
            Some(29.0),
            Some(70.0),
            Some(650.0),
            Some(45.0),
        )
        .unwrap()
    }

    fn adapter(provider: MockProvider) -> (InferenceAdapter, Arc<MockProvider>, SharedMetrics) {
        let provider = Arc::new(provider);
        let metrics = create_shared_metrics();
        let adapter = InferenceAdapter::with_provider(provider.clone(), metrics.clone());
        (adapter, provider, metrics)
    }

    #[tokio::test]
    async fn test_clean_success_attaches_usage() {
        let (adapter, provider, metrics) = adapter(MockProvider::text(
            r#"{"status":"potential_anomaly","confidence":0.8,"reasoning":"Leaf curl","primary_concern":"visual","signals_agree":false}"#,
            1_000,
        ));

        let outcome = adapter
            .analyze(&reading(), &HistoricalContext::unknown(), None)
            .await;

        match outcome {
            InferenceOutcome::Success { result, parse } => {
                assert_eq!(parse, ParseOutcome::Clean);
                assert_eq!(result.status, AnalysisStatus::PotentialAnomaly);
                assert_eq!(result.primary_concern, Some(PrimaryConcern::Visual));
                assert_eq!(result.tokens_used, 1_000);
                assert_eq!(result.cost, "0.000285");
                assert_eq!(result.timestamp, reading().timestamp());
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(provider.calls(), 1);
        assert_eq!(metrics.summary().clean_parses, 1);
    }

    #[tokio::test]
    async fn test_chatty_model_is_recovered() {
        let (adapter, _, metrics) = adapter(MockProvider::text(
            "Sure! Here is the result: {\"status\":\"normal\",\"confidence\":0.9} Hope it helps.",
            200,
        ));

        let outcome = adapter
            .analyze(&reading(), &HistoricalContext::unknown(), None)
            .await;

        assert!(matches!(
            outcome,
            InferenceOutcome::Success {
                parse: ParseOutcome::Recovered,
                ..
            }
        ));
        assert_eq!(metrics.summary().recovered_parses, 1);
    }

    #[tokio::test]
    async fn test_low_model_confidence_forced_uncertain() {
        let (adapter, _, _) = adapter(MockProvider::text(
            r#"{"status":"normal","confidence":0.2,"reasoning":"Hard to tell"}"#,
            100,
        ));

        let outcome = adapter
            .analyze(&reading(), &HistoricalContext::unknown(), None)
            .await;
        assert_eq!(outcome.result().status, AnalysisStatus::Uncertain);
    }

    #[tokio::test]
    async fn test_free_text_is_parse_failure() {
        let (adapter, _, metrics) =
            adapter(MockProvider::text("The plants look fine to me.", 50));

        let outcome = adapter
            .analyze(&reading(), &HistoricalContext::unknown(), None)
            .await;

        match outcome {
            InferenceOutcome::Failed {
                failure,
                degraded,
                billed,
            } => {
                assert_eq!(failure.category, ErrorCategory::ParseError);
                assert!(billed);
                assert_eq!(degraded.status, AnalysisStatus::Uncertain);
                assert_eq!(degraded.confidence, 0.1);
                assert_eq!(degraded.tokens_used, 0);
                assert_eq!(degraded.cost, "0.000000");
                assert_eq!(
                    degraded.recommended_action.as_deref(),
                    Some("Manual inspection required")
                );
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(metrics.summary().output_failures, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_names_category() {
        let (adapter, _, metrics) = adapter(MockProvider::failing(ErrorCategory::RateLimit));

        let outcome = adapter
            .analyze(&reading(), &HistoricalContext::unknown(), None)
            .await;

        assert!(!outcome.is_success());
        assert!(matches!(outcome, InferenceOutcome::Failed { billed: false, .. }));
        let degraded = outcome.result();
        assert_eq!(degraded.confidence, 0.0);
        assert_eq!(
            degraded.reasoning,
            "AI unavailable (RATE_LIMIT); using threshold fallback."
        );
        assert_eq!(metrics.summary().transport_failures, 1);
    }

    #[tokio::test]
    async fn test_empty_completion_is_billed() {
        let (adapter, _, _) = adapter(MockProvider::failing(ErrorCategory::EmptyResponse));

        let outcome = adapter
            .analyze(&reading(), &HistoricalContext::unknown(), None)
            .await;

        match outcome {
            InferenceOutcome::Failed {
                degraded, billed, ..
            } => {
                assert!(billed);
                assert_eq!(degraded.confidence, 0.0);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_image_forwarded_to_provider() {
        let (adapter, provider, _) = adapter(MockProvider::text(
            r#"{"status":"normal","confidence":0.9}"#,
            100,
        ));
        let image = ImageAttachment {
            bytes: vec![1, 2, 3],
            mime: "image/png".to_string(),
        };

        adapter
            .analyze(&reading(), &HistoricalContext::unknown(), Some(image))
            .await;
        assert_eq!(provider.images_seen(), vec![true]);
    }

    #[test]
    fn test_missing_credential_fails_construction() {
        let err = InferenceAdapter::from_config(&LlmConfig::default(), create_shared_metrics())
            .unwrap_err();
        assert!(matches!(err, crate::types::MonitorError::Config(_)));
    }
}
