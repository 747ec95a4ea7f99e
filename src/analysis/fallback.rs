//! Threshold rules used when inference is skipped or fails.

use crate::constants::fallback as thresholds;
use crate::types::{AnalysisResult, AnalysisStatus, PrimaryConcern, SensorReading};

struct Rule {
    fires: fn(&SensorReading) -> bool,
    message: &'static str,
    temperature: bool,
}

const RULES: &[Rule] = &[
    Rule {
        fires: |r| r.temperature().is_some_and(|t| t > thresholds::HIGH_TEMPERATURE_C),
        message: "High temperature detected (>35°C)",
        temperature: true,
    },
    Rule {
        fires: |r| r.temperature().is_some_and(|t| t < thresholds::LOW_TEMPERATURE_C),
        message: "Low temperature detected (<15°C)",
        temperature: true,
    },
    Rule {
        fires: |r| r.humidity().is_some_and(|h| h > thresholds::HIGH_HUMIDITY_PCT),
        message: "High humidity - fungal risk (>85%)",
        temperature: false,
    },
    Rule {
        fires: |r| r.co2().is_some_and(|c| c < thresholds::LOW_CO2_PPM),
        message: "Low CO₂ detected (<350ppm)",
        temperature: false,
    },
    Rule {
        fires: |r| r.soil_moisture().is_some_and(|s| s < thresholds::LOW_SOIL_MOISTURE_PCT),
        message: "Low soil moisture (<30%)",
        temperature: false,
    },
];

/// Classify a reading by fixed thresholds. Pure: no inference, no I/O.
pub fn fallback_analysis(reading: &SensorReading) -> AnalysisResult {
    let fired: Vec<&Rule> = RULES.iter().filter(|rule| (rule.fires)(reading)).collect();

    if fired.is_empty() {
        return AnalysisResult::local(
            AnalysisStatus::Normal,
            thresholds::NORMAL_CONFIDENCE,
            "All sensors within normal ranges",
            reading.timestamp(),
        );
    }

    let reasoning = fired
        .iter()
        .map(|rule| rule.message)
        .collect::<Vec<_>>()
        .join(" | ");
    let concern = fired
        .iter()
        .any(|rule| rule.temperature)
        .then_some(PrimaryConcern::Temperature);

    let mut result = AnalysisResult::local(
        AnalysisStatus::PotentialAnomaly,
        thresholds::ANOMALY_CONFIDENCE,
        reasoning,
        reading.timestamp(),
    )
    .with_primary_concern(concern);
    result.recommended_action = Some("Manual inspection recommended".to_string());
    result
}
