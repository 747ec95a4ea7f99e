//! Analysis Orchestrator (single reading)
//!
//! ## Pipeline
//!
//! ```text
//! parse payload ──► history ──► sensor check ──► image check ──► rate limit ──► inference
//!                                   │                │               │              │
//!                                   ▼                ▼               ▼              ▼
//!                               uncertain        uncertain       fallback     success / fallback
//! ```
//!
//! Every path ends in `AnalysisResult::finalize`, so the low-confidence
//! override holds no matter which step produced the result. Only malformed
//! payloads and missing configuration surface as errors.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::fallback::fallback_analysis;
use super::history::HistoryAggregator;
use super::validator::{ImageQualityValidator, SensorValidator};
use crate::ai::{ImageAttachment, InferenceAdapter, InferenceOutcome, SharedMetrics};
use crate::config::Config;
use crate::constants::result as result_constants;
use crate::storage::{CostTracker, RateLimiter, SharedDatabase};
use crate::types::{
    AnalysisResult, HistoricalContext, MonitorError, PrimaryConcern, Result, SensorReading,
    TokenCount, log_filter_warn,
};

/// Today's paid-inference usage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub date: NaiveDate,
    pub calls_today: u32,
    pub remaining: u32,
    pub limit: u32,
    pub tokens_today: u64,
    pub cost_today: String,
}

/// Inference availability, decided once at construction
#[derive(Debug, Clone)]
enum Inference {
    Ready(Arc<InferenceAdapter>),
    Unconfigured(String),
}

/// Runs the decision pipeline. Shared by the HTTP surface, the CLI and the
/// batch analyzer.
#[derive(Debug)]
pub struct Analyzer {
    history: HistoryAggregator,
    images: ImageQualityValidator,
    limiter: RateLimiter,
    costs: CostTracker,
    inference: Inference,
}

impl Analyzer {
    /// Build from configuration. A missing credential does not fail here;
    /// it is reported when a reading actually needs inference.
    pub fn from_config(config: &Config, db: SharedDatabase, metrics: SharedMetrics) -> Self {
        let inference = match InferenceAdapter::from_config(&config.llm, metrics) {
            Ok(adapter) => Inference::Ready(Arc::new(adapter)),
            Err(e) => {
                warn!("Inference disabled: {}", e);
                Inference::Unconfigured(e.to_string())
            }
        };

        Self {
            history: HistoryAggregator::from_config(&config.history),
            images: ImageQualityValidator::new(config.image.clone()),
            limiter: RateLimiter::new(db.clone(), config.limits.daily_call_limit),
            costs: CostTracker::new(db, Default::default()),
            inference,
        }
    }

    pub fn new(
        history: HistoryAggregator,
        images: ImageQualityValidator,
        limiter: RateLimiter,
        costs: CostTracker,
        adapter: Option<InferenceAdapter>,
    ) -> Self {
        let inference = match adapter {
            Some(adapter) => Inference::Ready(Arc::new(adapter)),
            None => Inference::Unconfigured("OpenAI API key not found".to_string()),
        };
        Self {
            history,
            images,
            limiter,
            costs,
            inference,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cost_tracker(&self) -> &CostTracker {
        &self.costs
    }

    pub fn image_validator(&self) -> &ImageQualityValidator {
        &self.images
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.inference, Inference::Ready(_))
    }

    /// Model name when inference is configured
    pub fn model(&self) -> Option<&str> {
        match &self.inference {
            Inference::Ready(adapter) => Some(adapter.model()),
            Inference::Unconfigured(_) => None,
        }
    }

    /// The adapter, or `MonitorError::Config` when inference is unconfigured
    pub fn inference(&self) -> Result<Arc<InferenceAdapter>> {
        match &self.inference {
            Inference::Ready(adapter) => Ok(Arc::clone(adapter)),
            Inference::Unconfigured(reason) => Err(MonitorError::Config(reason.clone())),
        }
    }

    /// Parse the JSON sensor payload and analyze it
    pub async fn analyze_payload(
        &self,
        sensor_json: &str,
        image: Option<ImageAttachment>,
    ) -> Result<AnalysisResult> {
        let reading = SensorReading::from_json(sensor_json)?;
        self.analyze(&reading, image).await
    }

    /// Analyze one reading with an optional image
    pub async fn analyze(
        &self,
        reading: &SensorReading,
        image: Option<ImageAttachment>,
    ) -> Result<AnalysisResult> {
        let history = self.history.context_at(reading.timestamp()).await;

        if let Some(result) = self.precheck(reading, image.as_ref()) {
            return Ok(result);
        }

        let limit = self.limiter.check_limit()?;
        if !limit.allowed {
            let result = fallback_analysis(reading)
                .with_reasoning_prefix("AI skipped (rate limit)")
                .finalize();
            return Ok(log_completed(result, "rate_limited"));
        }

        let adapter = self.inference()?;
        let has_image = image.is_some();
        match adapter.analyze(reading, &history, image).await {
            InferenceOutcome::Success { result, .. } => {
                self.record_usage(TokenCount::new(result.tokens_used));
                info!(
                    event = "analysis_completed",
                    status = %result.status,
                    confidence = result.confidence,
                    tokens_used = result.tokens_used,
                    has_image,
                    "Reading analyzed"
                );
                Ok(result.finalize())
            }
            InferenceOutcome::Failed {
                failure, billed, ..
            } => {
                warn!(
                    event = "analysis_fallback",
                    category = %failure.category,
                    "Inference failed, using threshold rules"
                );
                if billed {
                    self.record_billed_failure();
                }
                let result = fallback_analysis(reading)
                    .with_reasoning_prefix("AI unavailable")
                    .finalize();
                Ok(log_completed(result, "ai_unavailable"))
            }
        }
    }

    /// Short-circuit checks that never consume inference: missing sensors,
    /// then image quality.
    pub fn precheck(
        &self,
        reading: &SensorReading,
        image: Option<&ImageAttachment>,
    ) -> Option<AnalysisResult> {
        let sensors = SensorValidator::validate(reading);
        if !sensors.usable {
            return Some(missing_sensor_result(reading, sensors.issue_text()));
        }

        let check = self.images.validate(image.map(|img| img.bytes.as_slice()));
        if !check.usable {
            return Some(image_quality_result(reading, check.issue_text()));
        }

        None
    }

    /// Record one successful paid call. Storage failures are logged, the
    /// result has already been produced.
    pub fn record_usage(&self, tokens: TokenCount) {
        log_filter_warn(self.limiter.increment(), "Failed to record inference call");
        log_filter_warn(self.costs.add(tokens), "Failed to record inference cost");
    }

    /// A call that reached the model but produced no usable answer still
    /// counts against the daily limit. No tokens are charged for it.
    pub fn record_billed_failure(&self) {
        log_filter_warn(self.limiter.increment(), "Failed to record inference call");
    }

    /// Calls and spend recorded today
    pub fn usage(&self) -> Result<UsageReport> {
        let limit = self.limiter.check_limit()?;
        let spend = self.costs.current()?;
        Ok(UsageReport {
            date: spend.date,
            calls_today: limit.calls_today,
            remaining: limit.remaining,
            limit: limit.limit,
            tokens_today: spend.tokens,
            cost_today: spend.cost,
        })
    }

    /// History for a reading, without running the pipeline
    pub async fn context_for(&self, reading: &SensorReading) -> HistoricalContext {
        self.history.context_at(reading.timestamp()).await
    }
}

pub fn missing_sensor_result(reading: &SensorReading, issue: &str) -> AnalysisResult {
    let reasoning = if issue.is_empty() {
        "Insufficient sensor data for reliable analysis"
    } else {
        issue
    };
    AnalysisResult::uncertain(
        result_constants::MISSING_SENSOR_CONFIDENCE,
        reasoning,
        "Restore missing sensors and re-run analysis",
        reading.timestamp(),
    )
    .finalize()
}

pub fn image_quality_result(reading: &SensorReading, issue: &str) -> AnalysisResult {
    AnalysisResult::uncertain(
        result_constants::IMAGE_QUALITY_CONFIDENCE,
        format!("Image quality issue: {}", issue),
        "Retake photo with better lighting/focus",
        reading.timestamp(),
    )
    .with_primary_concern(Some(PrimaryConcern::Visual))
    .finalize()
}

fn log_completed(result: AnalysisResult, path: &str) -> AnalysisResult {
    info!(
        event = "analysis_completed",
        path,
        status = %result.status,
        confidence = result.confidence,
        "Reading analyzed without inference"
    );
    result
}
