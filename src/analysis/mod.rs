//! Plant-Health Analysis Pipeline
//!
//! - `validator`: sensor completeness and image quality checks
//! - `history`: 24h temperature summary from the readings log
//! - `fallback`: threshold rules used without inference
//! - `orchestrator`: the single-reading decision pipeline
//! - `batch`: sequential replay over the scenario set

pub mod batch;
pub mod fallback;
pub mod history;
pub mod orchestrator;
pub mod validator;

pub use batch::{
    BatchAnalyzer, BatchResult, BatchStarted, BatchStatus, PagerAlert, RunPhase, Scenario,
};
pub use fallback::fallback_analysis;
pub use history::{HistoryAggregator, summarize};
pub use orchestrator::{Analyzer, UsageReport, image_quality_result, missing_sensor_result};
pub use validator::{Check, ImageQualityValidator, SensorValidator};
