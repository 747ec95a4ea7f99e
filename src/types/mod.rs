pub mod analysis;
pub mod error;
pub mod history;
pub mod sensor;
pub mod utils;

pub use analysis::{AnalysisResult, AnalysisStatus, PrimaryConcern};
pub use error::{
    ErrorCategory, ErrorClassifier, LlmError, MonitorError, Result, ResultExt, ValidationError,
    ValidationErrorKind,
};
pub use history::{HistoricalContext, Trend};
pub use sensor::{SensorReading, SensorSnapshot, parse_timestamp};
pub use utils::{enum_to_str, json_bool, json_f64, json_string, log_filter_warn, round2};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Identifier of one pre-defined batch scenario
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ScenarioId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScenarioId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ScenarioId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Token count reported by the inference endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenCount(u64);

impl TokenCount {
    pub const ZERO: Self = Self(0);

    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for TokenCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TokenCount {
    fn from(count: u64) -> Self {
        Self(count)
    }
}

impl From<u32> for TokenCount {
    fn from(count: u32) -> Self {
        Self(count as u64)
    }
}
