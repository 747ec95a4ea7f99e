//! Sensor Reading Types
//!
//! A reading is parsed once from the inbound JSON payload, range-checked,
//! and immutable afterwards.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::sensor_range;
use crate::types::error::{Result, ValidationError, ValidationErrorKind};

/// One timestamped set of greenhouse sensor values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    timestamp: DateTime<FixedOffset>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    co2: Option<f64>,
    soil_moisture: Option<f64>,
}

/// Wire shape accepted from callers, including the field aliases the
/// dashboard and older firmware send.
#[derive(Debug, Deserialize)]
struct RawReading {
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<FixedOffset>,
    #[serde(default, alias = "temp")]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    co2: Option<f64>,
    #[serde(default, alias = "soilMoisture")]
    soil_moisture: Option<f64>,
}

impl SensorReading {
    /// Build a reading, enforcing the accepted range of every present value
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        temperature: Option<f64>,
        humidity: Option<f64>,
        co2: Option<f64>,
        soil_moisture: Option<f64>,
    ) -> Result<Self> {
        check_range("temperature", temperature, sensor_range::TEMPERATURE_C)?;
        check_range("humidity", humidity, sensor_range::HUMIDITY_PCT)?;
        check_range("co2", co2, sensor_range::CO2_PPM)?;
        check_range("soil_moisture", soil_moisture, sensor_range::SOIL_MOISTURE_PCT)?;

        Ok(Self {
            timestamp,
            temperature,
            humidity,
            co2,
            soil_moisture,
        })
    }

    /// Build a reading from stored data that may hold out-of-range values.
    /// Those values are dropped and their sensor names returned, so the
    /// reading is reported as unusable instead of rejected.
    pub fn with_rejected(
        timestamp: DateTime<FixedOffset>,
        temperature: Option<f64>,
        humidity: Option<f64>,
        co2: Option<f64>,
        soil_moisture: Option<f64>,
    ) -> (Self, Vec<&'static str>) {
        let mut rejected = Vec::new();
        let mut keep = |field: &'static str, value: Option<f64>, range: (f64, f64)| {
            if check_range(field, value, range).is_ok() {
                value
            } else {
                rejected.push(field);
                None
            }
        };

        let reading = Self {
            timestamp,
            temperature: keep("temperature", temperature, sensor_range::TEMPERATURE_C),
            humidity: keep("humidity", humidity, sensor_range::HUMIDITY_PCT),
            co2: keep("co2", co2, sensor_range::CO2_PPM),
            soil_moisture: keep("soil_moisture", soil_moisture, sensor_range::SOIL_MOISTURE_PCT),
        };
        (reading, rejected)
    }

    /// Parse and validate a JSON sensor payload
    pub fn from_json(payload: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(payload).map_err(|e| {
            ValidationError::new(
                ValidationErrorKind::Format,
                format!("sensor_data must be valid JSON: {}", e),
            )
        })?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawReading = serde_json::from_value(value)
            .map_err(|e| ValidationError::new(ValidationErrorKind::Schema, e.to_string()))?;
        Self::new(
            raw.timestamp,
            raw.temperature,
            raw.humidity,
            raw.co2,
            raw.soil_moisture,
        )
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn humidity(&self) -> Option<f64> {
        self.humidity
    }

    pub fn co2(&self) -> Option<f64> {
        self.co2
    }

    pub fn soil_moisture(&self) -> Option<f64> {
        self.soil_moisture
    }

    /// Names of the sensors that produced no value
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("co2", self.co2),
            ("soil_moisture", self.soil_moisture),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.is_none().then_some(name))
        .collect()
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            temperature: self.temperature,
            humidity: self.humidity,
            co2: self.co2,
            soil_moisture: self.soil_moisture,
        }
    }
}

impl<'de> Deserialize<'de> for SensorReading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawReading::deserialize(deserializer)?;
        SensorReading::new(
            raw.timestamp,
            raw.temperature,
            raw.humidity,
            raw.co2,
            raw.soil_moisture,
        )
        .map_err(serde::de::Error::custom)
    }
}

/// Sensor values echoed back alongside batch results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    #[serde(alias = "soil_moisture")]
    pub soil_moisture: Option<f64>,
}

fn check_range(field: &str, value: Option<f64>, (min, max): (f64, f64)) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => Err(ValidationError::new(
            ValidationErrorKind::Range,
            format!("{} must be between {} and {}, got {}", field, min, max, v),
        )
        .with_field(field)
        .into()),
        _ => Ok(()),
    }
}

/// Parse an ISO-8601 timestamp; values without an offset are taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<FixedOffset>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MonitorError;

    #[test]
    fn test_parse_full_reading() {
        let reading = SensorReading::from_json(
            r#"{"timestamp": "2025-06-01T12:00:00Z", "temperature": 24.5,
                "humidity": 60, "co2": 420, "soilMoisture": 45}"#,
        )
        .unwrap();
        assert_eq!(reading.temperature(), Some(24.5));
        assert_eq!(reading.soil_moisture(), Some(45.0));
        assert!(reading.missing_fields().is_empty());
    }

    #[test]
    fn test_with_rejected_drops_out_of_range() {
        let ts = parse_timestamp("2025-06-01T12:00:00Z").unwrap();
        let (reading, rejected) =
            SensorReading::with_rejected(ts, Some(24.0), Some(120.0), Some(-5.0), Some(40.0));

        assert_eq!(rejected, vec!["humidity", "co2"]);
        assert_eq!(reading.temperature(), Some(24.0));
        assert_eq!(reading.humidity(), None);
        assert_eq!(reading.missing_fields(), vec!["humidity", "co2"]);
    }

    #[test]
    fn test_aliases() {
        let reading = SensorReading::from_json(
            r#"{"timestamp": "2025-06-01T12:00:00+02:00", "temp": 20, "soil_moisture": 31}"#,
        )
        .unwrap();
        assert_eq!(reading.temperature(), Some(20.0));
        assert_eq!(reading.soil_moisture(), Some(31.0));
        assert_eq!(reading.missing_fields(), vec!["humidity", "co2"]);
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let reading =
            SensorReading::from_json(r#"{"timestamp": "2025-06-01T12:00:00"}"#).unwrap();
        assert_eq!(reading.timestamp().offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = SensorReading::from_json(
            r#"{"timestamp": "2025-06-01T12:00:00Z", "temperature": 75}"#,
        )
        .unwrap_err();
        match err {
            MonitorError::Validation(v) => {
                assert_eq!(v.kind, ValidationErrorKind::Range);
                assert_eq!(v.field.as_deref(), Some("temperature"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = SensorReading::from_json("{not json").unwrap_err();
        assert!(matches!(err, MonitorError::Validation(ref v) if v.kind == ValidationErrorKind::Format));
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let err = SensorReading::from_json(r#"{"temperature": 20}"#).unwrap_err();
        assert!(matches!(err, MonitorError::Validation(ref v) if v.kind == ValidationErrorKind::Schema));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let reading = SensorReading::from_json(
            r#"{"timestamp": "2025-06-01T12:00:00Z", "soil_moisture": 40}"#,
        )
        .unwrap();
        let json = serde_json::to_value(reading.snapshot()).unwrap();
        assert_eq!(json["soilMoisture"], 40.0);
        assert!(json["temperature"].is_null());
    }
}
