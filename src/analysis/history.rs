//! Historical Context Aggregator
//!
//! Summarizes the temperature readings of the look-back window preceding a
//! reading. The readings log is external and read-only; a missing or
//! malformed log yields the unknown context instead of an error.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::constants::history as history_constants;
use crate::types::{HistoricalContext, Trend, json_f64, parse_timestamp, round2};

#[derive(Debug, Clone)]
pub struct HistoryAggregator {
    readings_path: PathBuf,
    window: Duration,
}

impl HistoryAggregator {
    pub fn new(readings_path: impl Into<PathBuf>, window_hours: i64) -> Self {
        Self {
            readings_path: readings_path.into(),
            window: Duration::hours(window_hours),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.readings_path.clone(), config.window_hours)
    }

    pub fn readings_path(&self) -> &Path {
        &self.readings_path
    }

    /// Context for the window ending at `now`
    pub async fn context_at(&self, now: DateTime<FixedOffset>) -> HistoricalContext {
        let raw = match tokio::fs::read_to_string(&self.readings_path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(
                    path = %self.readings_path.display(),
                    "No readings log: {}", e
                );
                return HistoricalContext::unknown();
            }
        };

        let rows: Value = match serde_json::from_str(&raw) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    path = %self.readings_path.display(),
                    "Malformed readings log: {}", e
                );
                return HistoricalContext::unknown();
            }
        };

        summarize(points(&rows), now.with_timezone(&Utc), self.window)
    }
}

/// `(timestamp, temperature)` pairs from a JSON array; rows without both
/// are skipped. Naive timestamps are taken as UTC.
fn points(rows: &Value) -> Vec<(DateTime<Utc>, f64)> {
    let Some(rows) = rows.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let ts = parse_timestamp(row.get("timestamp")?.as_str()?)?;
            let temp = json_f64(row, "temperature")?;
            Some((ts.with_timezone(&Utc), temp))
        })
        .collect()
}

/// Summarize the points inside `[now - window, now]`.
///
/// The trend compares only the first and last in-window samples.
pub fn summarize(
    points: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    now: DateTime<Utc>,
    window: Duration,
) -> HistoricalContext {
    let start = now - window;

    let mut in_window: Vec<(DateTime<Utc>, f64)> = points
        .into_iter()
        .filter(|(ts, _)| *ts >= start && *ts <= now)
        .collect();

    let alerts = in_window
        .iter()
        .filter(|(_, temp)| {
            *temp >= history_constants::ALERT_HIGH_C || *temp <= history_constants::ALERT_LOW_C
        })
        .count() as u32;

    if in_window.is_empty() {
        return HistoricalContext {
            avg_temp: None,
            trend: Trend::Unknown,
            alerts,
        };
    }

    in_window.sort_by_key(|(ts, _)| *ts);

    let sum: f64 = in_window.iter().map(|(_, temp)| temp).sum();
    let avg = sum / in_window.len() as f64;

    let first = in_window[0].1;
    let last = in_window[in_window.len() - 1].1;
    let delta = last - first;
    let trend = if delta.abs() < history_constants::STABLE_DELTA_C {
        Trend::Stable
    } else if delta > 0.0 {
        Trend::Rising
    } else {
        Trend::Falling
    };

    HistoricalContext {
        avg_temp: Some(round2(avg)),
        trend,
        alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn at(hours_before: i64) -> DateTime<Utc> {
        now() - Duration::hours(hours_before)
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("2025-06-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_window_filter_and_trend() {
        let ctx = summarize(
            vec![(at(30), 40.0), (at(10), 20.0), (at(1), 22.0)],
            now(),
            Duration::hours(24),
        );
        assert_eq!(ctx.avg_temp, Some(21.0));
        assert_eq!(ctx.trend, Trend::Rising);
        assert_eq!(ctx.alerts, 0);
    }

    #[test]
    fn test_stable_and_falling() {
        let stable = summarize(vec![(at(5), 22.0), (at(2), 22.9)], now(), Duration::hours(24));
        assert_eq!(stable.trend, Trend::Stable);

        let falling = summarize(vec![(at(2), 20.0), (at(5), 26.0)], now(), Duration::hours(24));
        assert_eq!(falling.trend, Trend::Falling);
    }

    #[test]
    fn test_alerts_only_in_window() {
        let ctx = summarize(
            vec![(at(30), 40.0), (at(3), 35.0), (at(2), 15.0), (at(1), 25.0)],
            now(),
            Duration::hours(24),
        );
        assert_eq!(ctx.alerts, 2);
        assert_eq!(ctx.avg_temp, Some(25.0));
    }

    #[test]
    fn test_future_points_excluded() {
        let ctx = summarize(
            vec![(now() + Duration::hours(1), 30.0)],
            now(),
            Duration::hours(24),
        );
        assert_eq!(ctx, HistoricalContext::unknown());
    }

    #[tokio::test]
    async fn test_reads_log_with_mixed_rows() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"timestamp": "2025-06-02T02:00:00Z", "temperature": 20.0}},
                {{"timestamp": "2025-06-02T11:00:00", "temperature": "22.5"}},
                {{"timestamp": "not a time", "temperature": 50.0}},
                {{"temperature": 50.0}},
                "junk"
            ]"#
        )
        .unwrap();

        let aggregator = HistoryAggregator::new(file.path(), 24);
        let ctx = aggregator.context_at(now().fixed_offset()).await;
        assert_eq!(ctx.avg_temp, Some(21.25));
        assert_eq!(ctx.trend, Trend::Rising);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_log_is_unknown() {
        let aggregator = HistoryAggregator::new("/nonexistent/readings.json", 24);
        assert_eq!(
            aggregator.context_at(now().fixed_offset()).await,
            HistoricalContext::unknown()
        );

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let aggregator = HistoryAggregator::new(file.path(), 24);
        assert_eq!(
            aggregator.context_at(now().fixed_offset()).await,
            HistoricalContext::unknown()
        );
    }
}
