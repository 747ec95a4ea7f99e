use serde::{Deserialize, Serialize};

/// Direction of the temperature over the look-back window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Stable,
    Rising,
    Falling,
    #[default]
    Unknown,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Stable => write!(f, "stable"),
            Trend::Rising => write!(f, "rising"),
            Trend::Falling => write!(f, "falling"),
            Trend::Unknown => write!(f, "unknown"),
        }
    }
}

/// Summary of prior readings, recomputed per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalContext {
    pub avg_temp: Option<f64>,
    pub trend: Trend,
    pub alerts: u32,
}

impl HistoricalContext {
    /// Context used when no history is available
    pub fn unknown() -> Self {
        Self::default()
    }
}
