//! CLI Common Utilities
//!
//! Shared context and input helpers for command handlers.

use std::path::Path;
use std::sync::Arc;

use crate::ai::{ImageAttachment, SharedMetrics, create_shared_metrics};
use crate::analysis::{Analyzer, BatchAnalyzer};
use crate::config::{Config, ConfigLoader};
use crate::constants::image::DEFAULT_MIME;
use crate::storage::{BatchResultStore, Database, SharedDatabase};
use crate::types::{MonitorError, Result};

/// Command execution context
///
/// Loads the merged configuration and opens the database. Commands build
/// only the analyzers they need from it.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub db: SharedDatabase,
    pub metrics: SharedMetrics,
}

impl CommandContext {
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::load()?;
        let db = Database::open_initialized(config.storage.database_path())?;
        Ok(Self {
            config,
            db,
            metrics: create_shared_metrics(),
        })
    }

    pub fn analyzer(&self) -> Arc<Analyzer> {
        Arc::new(Analyzer::from_config(
            &self.config,
            self.db.clone(),
            self.metrics.clone(),
        ))
    }

    /// Batch analyzer with the last persisted run loaded
    pub fn batch(&self) -> Arc<BatchAnalyzer> {
        Arc::new(BatchAnalyzer::with_cached_results(
            self.analyzer(),
            self.config.batch.clone(),
            BatchResultStore::new(self.db.clone()),
        ))
    }
}

/// Inline JSON (starting with `{`) or a path to a JSON file
pub fn read_sensor_payload(arg: &str) -> Result<String> {
    if arg.trim_start().starts_with('{') {
        return Ok(arg.to_string());
    }
    std::fs::read_to_string(arg)
        .map_err(|e| MonitorError::Config(format!("Cannot read sensor data '{}': {}", arg, e)))
}

/// Read an image file; the MIME type follows the extension
pub fn read_image(path: &Path) -> Result<ImageAttachment> {
    let bytes = std::fs::read(path).map_err(|e| {
        MonitorError::Image(format!("Cannot read image '{}': {}", path.display(), e))
    })?;
    Ok(ImageAttachment {
        bytes,
        mime: mime_for(path).to_string(),
    })
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => DEFAULT_MIME,
    }
}

/// Check if the project directory exists
pub fn is_initialized() -> bool {
    ConfigLoader::is_project_initialized()
}
