//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/greenhouse-monitor/) and project (.greenhouse/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{image, limits, network};
use crate::types::{MonitorError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Inference provider settings
    pub llm: LlmConfig,

    /// Daily call limit
    pub limits: LimitsConfig,

    /// Image quality heuristics
    pub image: ImageQualityConfig,

    /// Persisted state location
    pub storage: StorageConfig,

    /// Historical context source
    pub history: HistoryConfig,

    /// Batch scenario source
    pub batch: BatchConfig,

    /// HTTP surface
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            limits: LimitsConfig::default(),
            image: ImageQualityConfig::default(),
            storage: StorageConfig::default(),
            history: HistoryConfig::default(),
            batch: BatchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `MonitorError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(MonitorError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(MonitorError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(MonitorError::Config(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        if let Some(base) = &self.llm.api_base {
            let parsed = url::Url::parse(base)
                .map_err(|e| MonitorError::Config(format!("Invalid llm.api_base '{}': {}", base, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(MonitorError::Config(format!(
                    "llm.api_base must use http or https, got '{}'",
                    parsed.scheme()
                )));
            }
        }

        if self.image.max_bytes == 0 || self.image.min_dimension == 0 || self.image.sample_size < 3
        {
            return Err(MonitorError::Config(
                "image.max_bytes and image.min_dimension must be > 0, image.sample_size >= 3"
                    .to_string(),
            ));
        }

        if !(0.0..=255.0).contains(&self.image.min_brightness)
            || !(0.0..=255.0).contains(&self.image.min_edge_mean)
        {
            return Err(MonitorError::Config(
                "image.min_brightness and image.min_edge_mean must be within 0..=255".to_string(),
            ));
        }

        if self.history.window_hours <= 0 {
            return Err(MonitorError::Config(
                "history.window_hours must be greater than 0".to_string(),
            ));
        }

        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| MonitorError::Config(format!("Invalid server.bind: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Inference provider settings
///
/// The API key is never serialized and is redacted in debug output; the
/// provider converts it to `SecretString` at construction.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output tokens per call
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// API key (never serialized)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL (for compatible endpoints)
    pub api_base: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-5-nano".to_string(),
            temperature: 0.3,
            max_tokens: 300,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            api_key: None,
            api_base: None,
        }
    }
}

impl LlmConfig {
    /// Whether a non-blank credential is configured
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

// =============================================================================
// Limits Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Paid inference calls allowed per calendar day
    pub daily_call_limit: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_call_limit: limits::DEFAULT_DAILY_CALLS,
        }
    }
}

// =============================================================================
// Image Quality Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageQualityConfig {
    pub max_bytes: usize,
    pub min_dimension: u32,
    /// Side of the grayscale square used for the brightness/edge heuristics
    pub sample_size: u32,
    pub min_brightness: f64,
    pub min_edge_mean: f64,
}

impl Default for ImageQualityConfig {
    fn default() -> Self {
        Self {
            max_bytes: image::MAX_BYTES,
            min_dimension: image::MIN_DIMENSION,
            sample_size: image::SAMPLE_SIZE,
            min_brightness: image::MIN_BRIGHTNESS,
            min_edge_mean: image::MIN_EDGE_MEAN,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".greenhouse/data"),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("monitor.db")
    }
}

// =============================================================================
// History Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// JSON array of past readings (`timestamp`, `temperature`)
    pub readings_path: PathBuf,
    pub window_hours: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            readings_path: PathBuf::from("mock_data/sensor_readings.json"),
            window_hours: crate::constants::history::WINDOW_HOURS,
        }
    }
}

// =============================================================================
// Batch Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// JSON array of pre-defined scenarios
    pub scenarios_path: PathBuf,
    /// Directory scenario image filenames are resolved against
    pub images_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenarios_path: PathBuf::from("mock_data/data.json"),
            images_dir: PathBuf::from("mock_data/images"),
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: network::DEFAULT_BIND.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
