//! Two-stage JSON extraction for model output
//!
//! 1. Strict: trim, strip a markdown code fence and BOM, parse as an object.
//! 2. Recovery: scan for the first balanced `{...}` (string/escape aware)
//!    within a bounded prefix and parse that.
//!
//! Nothing is synthesized: unbalanced or truncated output is a parse failure,
//! so free text never counts as a successful answer.

use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::parsing;
use crate::types::{ErrorCategory, MonitorError, Result};

/// How the JSON object was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The output was a JSON object (optionally fenced)
    Clean,
    /// The object was cut out of surrounding text
    Recovered,
}

/// Extracts a JSON object from model output
#[derive(Debug, Clone)]
pub struct JsonRepairer {
    max_scan_bytes: usize,
}

impl Default for JsonRepairer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRepairer {
    pub fn new() -> Self {
        Self {
            max_scan_bytes: parsing::MAX_RECOVERY_SCAN_BYTES,
        }
    }

    pub fn with_max_scan_bytes(max_scan_bytes: usize) -> Self {
        Self { max_scan_bytes }
    }

    /// Parse a JSON object, recovering it from surrounding text if needed
    pub fn parse(&self, raw: &str) -> Result<(Value, ParseOutcome)> {
        let cleaned = self.preprocess(raw);

        if cleaned.is_empty() {
            return Err(MonitorError::llm_with_category(
                ErrorCategory::EmptyResponse,
                "Model returned empty content",
            ));
        }

        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&cleaned) {
            return Ok((value, ParseOutcome::Clean));
        }

        debug!("Strict JSON parse failed, scanning for embedded object");

        if let Some(candidate) = self.first_balanced_object(&cleaned)
            && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate)
        {
            warn!(event = "json_recovered", "JSON object recovered from surrounding text");
            return Ok((value, ParseOutcome::Recovered));
        }

        Err(MonitorError::llm_with_category(
            ErrorCategory::ParseError,
            format!(
                "No JSON object in model output. Content preview: {}...",
                cleaned.chars().take(200).collect::<String>()
            ),
        ))
    }

    /// Trim, drop BOM and code fences
    fn preprocess(&self, raw: &str) -> String {
        let s = raw.trim().trim_start_matches('\u{feff}');
        self.strip_code_fences(s).trim().to_string()
    }

    /// Strip markdown code fences
    fn strip_code_fences<'a>(&self, s: &'a str) -> &'a str {
        let mut result = s;

        // ```json ... ``` or ``` ... ```
        if result.starts_with("```")
            && let Some(first_newline) = result.find('\n')
        {
            result = &result[first_newline + 1..];
        }

        if let Some(stripped) = result.trim_end().strip_suffix("```") {
            result = stripped;
        }

        result
    }

    /// First balanced `{...}` starting at the first `{`, within the scan bound
    fn first_balanced_object<'a>(&self, s: &'a str) -> Option<&'a str> {
        let start = s.find('{')?;

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escape = false;

        for (i, ch) in s[start..].char_indices() {
            if i >= self.max_scan_bytes {
                debug!(limit = self.max_scan_bytes, "JSON recovery scan limit reached");
                return None;
            }

            if escape {
                escape = false;
                continue;
            }

            match ch {
                '\\' if in_string => escape = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        let end = start + i + ch.len_utf8();
                        return Some(&s[start..end]);
                    }
                }
                _ => {}
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(err: MonitorError) -> ErrorCategory {
        match err {
            MonitorError::Llm(e) => e.category,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_valid_json() {
        let (value, outcome) = JsonRepairer::new()
            .parse(r#"{"status": "normal"}"#)
            .unwrap();
        assert_eq!(outcome, ParseOutcome::Clean);
        assert_eq!(value["status"], "normal");
    }

    #[test]
    fn test_strip_code_fences() {
        let input = "```json\n{\"status\": \"normal\"}\n```";
        let (value, outcome) = JsonRepairer::new().parse(input).unwrap();
        assert_eq!(outcome, ParseOutcome::Clean);
        assert_eq!(value["status"], "normal");
    }

    #[test]
    fn test_extract_from_mixed() {
        let input = r#"Here is my assessment:
{"status": "uncertain", "reasoning": "braces {in} strings \"quoted\""}
Let me know if you need more."#;
        let (value, outcome) = JsonRepairer::new().parse(input).unwrap();
        assert_eq!(outcome, ParseOutcome::Recovered);
        assert_eq!(value["status"], "uncertain");
    }

    #[test]
    fn test_free_text_rejected() {
        let err = JsonRepairer::new()
            .parse("The plant looks healthy to me.")
            .unwrap_err();
        assert_eq!(category(err), ErrorCategory::ParseError);
    }

    #[test]
    fn test_truncated_object_rejected() {
        let err = JsonRepairer::new()
            .parse(r#"{"status": "normal", "confidence": 0.9"#)
            .unwrap_err();
        assert_eq!(category(err), ErrorCategory::ParseError);
    }

    #[test]
    fn test_array_is_not_an_answer() {
        assert!(JsonRepairer::new().parse("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_empty_response() {
        let err = JsonRepairer::new().parse("   \n").unwrap_err();
        assert_eq!(category(err), ErrorCategory::EmptyResponse);
    }

    #[test]
    fn test_scan_bound() {
        let padded = format!("note: {{\"a\": \"{}\"}}", "x".repeat(200));
        assert!(JsonRepairer::with_max_scan_bytes(64).parse(&padded).is_err());
        assert!(JsonRepairer::with_max_scan_bytes(1024).parse(&padded).is_ok());
    }
}
