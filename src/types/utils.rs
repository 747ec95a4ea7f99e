//! Shared utility functions for type serialization and common operations.
//!
//! ## JSON Extraction Helpers
//!
//! Model output is read field-by-field rather than through a strict struct so
//! that a single malformed optional field does not discard the whole answer:
//! - `json_string` - Extract non-empty strings
//! - `json_bool`, `json_f64` - Extract primitives (numbers may arrive as strings)

use serde::Serialize;
use std::fmt::Display;

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

/// Extract a non-empty, trimmed string from a JSON value by key.
#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Extract a boolean; `"true"`/`"false"` strings are accepted.
#[inline]
pub fn json_bool(value: &serde_json::Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract a finite number; numeric strings are accepted.
#[inline]
pub fn json_f64(value: &serde_json::Value, key: &str) -> Option<f64> {
    let number = match value.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

// =============================================================================
// Misc
// =============================================================================

/// Serialize an enum to its serde string representation (without quotes).
/// Uses serde_json internally to ensure consistent serialization with
/// the `#[serde(rename_all = ...)]` attributes on enums.
pub fn enum_to_str<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// Filter an iterator of Results, logging errors at warn level before discarding.
///
/// # Example
/// ```ignore
/// let rows: Vec<_> = entries
///     .filter_map(|r| log_filter_warn(r, "skipping history row"))
///     .collect();
/// ```
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

/// Round to two decimal places
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisStatus, Trend};
    use serde_json::json;

    #[test]
    fn test_enum_to_str() {
        assert_eq!(enum_to_str(&AnalysisStatus::PotentialAnomaly), "potential_anomaly");
        assert_eq!(enum_to_str(&Trend::Rising), "rising");
    }

    #[test]
    fn test_json_string_skips_blank() {
        let v = json!({"a": "  hi ", "b": "   ", "c": 3});
        assert_eq!(json_string(&v, "a").as_deref(), Some("hi"));
        assert_eq!(json_string(&v, "b"), None);
        assert_eq!(json_string(&v, "c"), None);
    }

    #[test]
    fn test_json_f64_accepts_numeric_strings() {
        let v = json!({"a": 0.8, "b": "0.4", "c": "high"});
        assert_eq!(json_f64(&v, "a"), Some(0.8));
        assert_eq!(json_f64(&v, "b"), Some(0.4));
        assert_eq!(json_f64(&v, "c"), None);
        assert_eq!(json_f64(&v, "missing"), None);
    }

    #[test]
    fn test_json_bool() {
        let v = json!({"a": true, "b": "false", "c": null});
        assert_eq!(json_bool(&v, "a"), Some(true));
        assert_eq!(json_bool(&v, "b"), Some(false));
        assert_eq!(json_bool(&v, "c"), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(21.005_1), 21.01);
        assert_eq!(round2(21.0), 21.0);
    }
}
