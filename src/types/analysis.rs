//! Analysis Result Types
//!
//! `AnalysisResult` is the single shape every pipeline path produces.
//! `finalize` enforces the invariants shared by all of them.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::constants::result as result_constants;

/// Plant-health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Normal,
    PotentialAnomaly,
    Uncertain,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::PotentialAnomaly => write!(f, "potential_anomaly"),
            Self::Uncertain => write!(f, "uncertain"),
        }
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "potential_anomaly" => Ok(Self::PotentialAnomaly),
            "uncertain" => Ok(Self::Uncertain),
            _ => Err(format!(
                "Unknown status: {}. Valid values: normal, potential_anomaly, uncertain",
                s
            )),
        }
    }
}

/// The signal that drove the assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryConcern {
    Temperature,
    Humidity,
    Co2,
    SoilMoisture,
    Visual,
}

impl std::str::FromStr for PrimaryConcern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "temperature" => Ok(Self::Temperature),
            "humidity" => Ok(Self::Humidity),
            "co2" => Ok(Self::Co2),
            "soil_moisture" => Ok(Self::SoilMoisture),
            "visual" => Ok(Self::Visual),
            _ => Err(format!("Unknown primary concern: {}", s)),
        }
    }
}

/// Plant-health assessment for one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    pub confidence: f64,
    pub reasoning: String,
    pub visual_assessment: Option<String>,
    pub signals_agree: Option<bool>,
    pub primary_concern: Option<PrimaryConcern>,
    pub recommended_action: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(rename = "tokensUsed", alias = "tokens_used", default)]
    pub tokens_used: u64,
    #[serde(default = "zero_cost")]
    pub cost: String,
}

fn zero_cost() -> String {
    result_constants::ZERO_COST.to_string()
}

impl AnalysisResult {
    /// A result produced without calling the model
    pub fn local(
        status: AnalysisStatus,
        confidence: f64,
        reasoning: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            status,
            confidence,
            reasoning: reasoning.into(),
            visual_assessment: None,
            signals_agree: None,
            primary_concern: None,
            recommended_action: None,
            timestamp,
            tokens_used: 0,
            cost: zero_cost(),
        }
    }

    /// Uncertain result with a reason and operator action
    pub fn uncertain(
        confidence: f64,
        reasoning: impl Into<String>,
        recommended_action: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            recommended_action: Some(recommended_action.into()),
            ..Self::local(AnalysisStatus::Uncertain, confidence, reasoning, timestamp)
        }
    }

    pub fn with_primary_concern(mut self, concern: Option<PrimaryConcern>) -> Self {
        self.primary_concern = concern;
        self
    }

    /// Prepend a note to the reasoning (`"<prefix>; <reasoning>"`)
    pub fn with_reasoning_prefix(mut self, prefix: &str) -> Self {
        self.reasoning = format!("{}; {}", prefix, self.reasoning)
            .trim()
            .to_string();
        self
    }

    /// Enforce the invariants every emitted result satisfies: confidence in
    /// [0,1], status uncertain below the low-confidence threshold, bounded
    /// reasoning.
    pub fn finalize(mut self) -> Self {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        if self.confidence < result_constants::LOW_CONFIDENCE_THRESHOLD {
            self.status = AnalysisStatus::Uncertain;
        }
        if self.reasoning.chars().count() > result_constants::MAX_REASONING_CHARS {
            self.reasoning = self
                .reasoning
                .chars()
                .take(result_constants::MAX_REASONING_CHARS)
                .collect();
        }
        self
    }
}
