//! Prompt Builder
//!
//! Section-based prompt construction for the plant-health assessment.
//! The system instruction is fixed; the user prompt embeds the current
//! reading, the 24h summary and whether an image is attached.

use chrono::{DateTime, FixedOffset};

use crate::types::{HistoricalContext, SensorSnapshot};

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition
    Role { subject: String, task: String },
    /// Bulleted rules under a header
    Rules { header: String, rules: Vec<String> },
    /// `HEADER:` followed by `Key: value` lines
    Block {
        header: String,
        lines: Vec<(String, String)>,
    },
    /// Required output shape
    Schema(String),
    /// Free text
    Custom(String),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, subject: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            subject: subject.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn rules(mut self, header: &str, rules: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Rules {
            header: header.to_string(),
            rules: rules.into_iter().map(String::from).collect(),
        });
        self
    }

    pub fn block(mut self, header: &str, lines: Vec<(&str, String)>) -> Self {
        self.sections.push(PromptSection::Block {
            header: header.to_string(),
            lines: lines
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        });
        self
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.sections.push(PromptSection::Schema(schema.to_string()));
        self
    }

    pub fn custom(mut self, content: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Custom(content.into()));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { subject, task } => {
                    prompt.push_str(&format!("You are {} {}.\n\n", subject, task));
                }
                PromptSection::Rules { header, rules } => {
                    prompt.push_str(&format!("{}:\n", header));
                    for rule in rules {
                        prompt.push_str(&format!("- {}\n", rule));
                    }
                    prompt.push('\n');
                }
                PromptSection::Block { header, lines } => {
                    prompt.push_str(&format!("{}:\n", header));
                    for (key, value) in lines {
                        prompt.push_str(&format!("{}: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Schema(schema) => {
                    prompt.push_str("Respond ONLY with valid JSON matching this schema:\n");
                    prompt.push_str(&schema);
                    prompt.push_str("\n\n");
                }
                PromptSection::Custom(content) => {
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

const RESULT_SCHEMA: &str = r#"{
  "status": "normal" | "potential_anomaly" | "uncertain",
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation (max 2 sentences)",
  "primary_concern": "temperature" | "humidity" | "co2" | "soil_moisture" | "visual" | null,
  "visual_assessment": "max 25 words describing what you observe in the image (or null if no image)" | null,
  "signals_agree": true | false | null,
  "recommended_action": "what operator should check" | null
}"#;

/// Prompts for the plant-health assessment
pub struct AssessmentPrompt;

impl AssessmentPrompt {
    /// Fixed system instruction
    pub fn system() -> String {
        PromptBuilder::new()
            .role(
                "a greenhouse monitoring system",
                "analyzing sensor data and visual inspection for cherry tomato plants",
            )
            .rules(
                "CRITICAL INSTRUCTIONS",
                vec![
                    "If any sensor reading is missing or clearly invalid, return status \"uncertain\"",
                    "If image is provided but blurry/dark/obstructed, return status \"uncertain\" and mention image quality issue",
                    "If sensor data and visual assessment CONFLICT, return status \"uncertain\" and explain the conflict",
                    "Consider time of day context (night heat is more concerning)",
                    "Consider rate of change (sudden vs gradual)",
                    "If multiple factors conflict, return status \"uncertain\"",
                    "Always provide brief reasoning (max 2 sentences)",
                    "Keep visual_assessment to maximum 25 words",
                ],
            )
            .schema(RESULT_SCHEMA)
            .build()
    }

    /// Per-reading user prompt
    pub fn user(
        timestamp: DateTime<FixedOffset>,
        sensors: &SensorSnapshot,
        history: &HistoricalContext,
        has_image: bool,
    ) -> String {
        let visual = if has_image {
            "VISUAL DATA: Plant image attached for visual inspection."
        } else {
            "VISUAL DATA: No image available - sensor-only analysis."
        };
        let task = if has_image {
            "Analyze this reading for plant stress indicators. Cross-reference sensor data with visual assessment."
        } else {
            "Analyze this reading for plant stress indicators."
        };

        PromptBuilder::new()
            .block(
                "CURRENT READING",
                vec![
                    ("Time", timestamp.to_rfc3339()),
                    ("Temperature", with_unit(sensors.temperature, "°C")),
                    ("Humidity", with_unit(sensors.humidity, "%")),
                    ("CO₂", with_unit(sensors.co2, "ppm")),
                    ("Soil Moisture", with_unit(sensors.soil_moisture, "%")),
                ],
            )
            .block(
                "CONTEXT (past 24 hours)",
                vec![
                    ("Average temp", with_unit(history.avg_temp, "°C")),
                    ("Trend", history.trend.to_string()),
                    ("Previous alerts", history.alerts.to_string()),
                ],
            )
            .custom(visual)
            .custom(task)
            .build()
    }
}

fn with_unit(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", v, unit),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Trend, parse_timestamp};

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot {
            temperature: Some(28.5),
            humidity: Some(65.0),
            co2: Some(800.0),
            soil_moisture: None,
        }
    }

    #[test]
    fn test_system_prompt_rules_and_schema() {
        let prompt = AssessmentPrompt::system();
        assert!(prompt.starts_with("You are a greenhouse monitoring system"));
        assert!(prompt.contains("CRITICAL INSTRUCTIONS:\n- If any sensor"));
        assert!(prompt.contains("Respond ONLY with valid JSON"));
        assert!(prompt.contains("\"signals_agree\""));
    }

    #[test]
    fn test_user_prompt_sections() {
        let ts = parse_timestamp("2025-06-01T02:00:00+00:00").unwrap();
        let history = HistoricalContext {
            avg_temp: Some(24.31),
            trend: Trend::Rising,
            alerts: 2,
        };
        let prompt = AssessmentPrompt::user(ts, &snapshot(), &history, false);

        assert!(prompt.starts_with("CURRENT READING:\nTime: 2025-06-01T02:00:00+00:00"));
        assert!(prompt.contains("Temperature: 28.5°C"));
        assert!(prompt.contains("Humidity: 65%"));
        assert!(prompt.contains("Soil Moisture: N/A"));
        assert!(prompt.contains("Average temp: 24.31°C"));
        assert!(prompt.contains("Trend: rising"));
        assert!(prompt.contains("Previous alerts: 2"));
        assert!(prompt.contains("No image available"));
        assert!(!prompt.contains("Cross-reference"));
    }

    #[test]
    fn test_user_prompt_with_image() {
        let ts = parse_timestamp("2025-06-01T02:00:00Z").unwrap();
        let prompt =
            AssessmentPrompt::user(ts, &snapshot(), &HistoricalContext::unknown(), true);
        assert!(prompt.contains("Plant image attached"));
        assert!(prompt.contains("Cross-reference"));
        assert!(prompt.contains("Average temp: N/A"));
        assert!(prompt.contains("Trend: unknown"));
    }

    #[test]
    fn test_builder_block_format() {
        let prompt = PromptBuilder::new()
            .block("HEADER", vec![("Key", "value".to_string())])
            .build();
        assert_eq!(prompt, "HEADER:\nKey: value");
    }
}
