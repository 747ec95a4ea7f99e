//! Greenhouse Monitor - plant-health analysis backend
//!
//! Accepts greenhouse sensor readings with an optional plant photo and
//! returns a `normal` / `potential_anomaly` / `uncertain` assessment.
//!
//! ## Decision Pipeline
//!
//! - **Validation**: missing sensors and unusable images short-circuit to `uncertain`
//! - **History**: 24h temperature summary from the readings log
//! - **Rate limit**: daily cap on paid inference calls, persisted in SQLite
//! - **Inference**: OpenAI-compatible vision model with two-stage JSON parsing
//! - **Fallback**: fixed threshold rules when inference is skipped or fails
//!
//! ## Quick Start
//!
//! ```ignore
//! use greenhouse_monitor::{Analyzer, ConfigLoader, Database};
//! use greenhouse_monitor::ai::create_shared_metrics;
//!
//! let config = ConfigLoader::load()?;
//! let db = Database::open_initialized(config.storage.database_path())?;
//! let analyzer = Analyzer::from_config(&config, db, create_shared_metrics());
//! let result = analyzer.analyze_payload(r#"{"temperature": 24, ...}"#, None).await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: provider abstraction, prompt, response parsing, cost and stats
//! - [`analysis`]: validators, history, fallback rules, orchestrator, batch
//! - [`storage`]: SQLite persistence for counters and batch results
//! - [`config`]: layered configuration
//! - [`server`]: HTTP surface

pub mod ai;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod constants;
pub mod server;
pub mod storage;
pub mod types;

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, MonitorError, Result, ResultExt};

// Domain
pub use types::{AnalysisResult, AnalysisStatus, HistoricalContext, SensorReading};

// Storage
pub use storage::{Database, SharedDatabase};

// Pipeline
pub use analysis::{Analyzer, BatchAnalyzer, fallback_analysis};

// AI
pub use ai::{InferenceAdapter, LlmProvider, LlmResponse, MetricsCollector, SharedMetrics};
