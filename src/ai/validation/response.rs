//! Response Validation
//!
//! Turns the model's JSON object into a typed assessment:
//! - `status` must be one of the three known values
//! - `confidence` must be numeric
//! - optional fields are read leniently; unknown `primary_concern` values
//!   are dropped rather than failing the whole answer

use serde_json::Value;
use tracing::debug;

use crate::types::{
    AnalysisStatus, ErrorCategory, MonitorError, PrimaryConcern, Result, json_bool, json_f64,
    json_string,
};

/// Fields the model is asked to return
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAssessment {
    pub status: AnalysisStatus,
    pub confidence: f64,
    pub reasoning: String,
    pub visual_assessment: Option<String>,
    pub signals_agree: Option<bool>,
    pub primary_concern: Option<PrimaryConcern>,
    pub recommended_action: Option<String>,
}

/// Validates the model's answer object
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, value: &Value) -> Result<ModelAssessment> {
        let status = json_string(value, "status")
            .ok_or_else(|| parse_error("missing 'status'"))?
            .parse::<AnalysisStatus>()
            .map_err(parse_error)?;

        let confidence =
            json_f64(value, "confidence").ok_or_else(|| parse_error("missing numeric 'confidence'"))?;

        let primary_concern = json_string(value, "primary_concern").and_then(|raw| {
            match raw.to_lowercase().as_str() {
                "none" | "null" => None,
                _ => match raw.parse::<PrimaryConcern>() {
                    Ok(concern) => Some(concern),
                    Err(e) => {
                        debug!("Ignoring primary_concern: {}", e);
                        None
                    }
                },
            }
        });

        Ok(ModelAssessment {
            status,
            confidence,
            reasoning: json_string(value, "reasoning").unwrap_or_default(),
            visual_assessment: json_string(value, "visual_assessment"),
            signals_agree: json_bool(value, "signals_agree"),
            primary_concern,
            recommended_action: json_string(value, "recommended_action"),
        })
    }
}

fn parse_error(message: impl Into<String>) -> MonitorError {
    MonitorError::llm_with_category(
        ErrorCategory::ParseError,
        format!("Invalid model answer: {}", message.into()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_answer() {
        let assessment = ResponseValidator::new()
            .validate(&json!({
                "status": "potential_anomaly",
                "confidence": 0.72,
                "reasoning": "Leaves wilting while soil is dry",
                "visual_assessment": "Drooping leaves",
                "signals_agree": true,
                "primary_concern": "soil_moisture",
                "recommended_action": "Irrigate zone B"
            }))
            .unwrap();

        assert_eq!(assessment.status, AnalysisStatus::PotentialAnomaly);
        assert_eq!(assessment.primary_concern, Some(PrimaryConcern::SoilMoisture));
        assert_eq!(assessment.signals_agree, Some(true));
    }

    #[test]
    fn test_unknown_concern_dropped() {
        let assessment = ResponseValidator::new()
            .validate(&json!({
                "status": "normal",
                "confidence": "0.9",
                "primary_concern": "light"
            }))
            .unwrap();
        assert_eq!(assessment.primary_concern, None);
        assert_eq!(assessment.confidence, 0.9);
        assert!(assessment.reasoning.is_empty());
    }

    #[test]
    fn test_invalid_status_is_parse_error() {
        let err = ResponseValidator::new()
            .validate(&json!({"status": "great", "confidence": 0.9}))
            .unwrap_err();
        assert!(matches!(err, MonitorError::Llm(ref e) if e.category == ErrorCategory::ParseError));
    }

    #[test]
    fn test_missing_confidence_is_parse_error() {
        assert!(
            ResponseValidator::new()
                .validate(&json!({"status": "normal", "confidence": "high"}))
                .is_err()
        );
    }
}
