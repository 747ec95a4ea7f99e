//! Daily Rate Limiter
//!
//! Persisted call counter keyed by calendar day. The stored day is compared
//! with the current one on every check/increment, and a mismatch resets the
//! counter inside the same transaction that observed it.
//!
//! `check_limit` and `increment` are separate steps around the paid call:
//! concurrent requests can each pass the check with one call remaining.

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, warn};

use super::SharedDatabase;
use crate::types::Result;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Outcome of a limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitStatus {
    pub allowed: bool,
    pub remaining: u32,
    pub calls_today: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Persisted daily counter gating paid inference
#[derive(Debug, Clone)]
pub struct RateLimiter {
    db: SharedDatabase,
    daily_limit: u32,
}

impl RateLimiter {
    pub fn new(db: SharedDatabase, daily_limit: u32) -> Self {
        Self { db, daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Check whether another call is allowed today
    pub fn check_limit(&self) -> Result<LimitStatus> {
        self.check_limit_on(today())
    }

    pub fn check_limit_on(&self, day: NaiveDate) -> Result<LimitStatus> {
        let limit = self.daily_limit;
        let calls = self.db.transaction(move |conn| current_calls(conn, day))?;

        let allowed = calls < limit;
        let status = LimitStatus {
            allowed,
            remaining: limit.saturating_sub(calls),
            calls_today: calls,
            limit,
            message: (!allowed).then(|| {
                "Daily API limit reached. Using fallback threshold analysis.".to_string()
            }),
        };

        if !allowed {
            warn!(
                event = "rate_limit_exceeded",
                calls_today = calls,
                limit,
                "Daily inference limit reached"
            );
        }

        Ok(status)
    }

    /// Record one paid call; returns the updated count for the day
    pub fn increment(&self) -> Result<u32> {
        self.increment_on(today())
    }

    pub fn increment_on(&self, day: NaiveDate) -> Result<u32> {
        let calls = self.db.transaction(move |conn| {
            let calls = current_calls(conn, day)?.saturating_add(1);
            store(conn, day, calls)?;
            Ok(calls)
        })?;

        debug!(calls_today = calls, limit = self.daily_limit, "Inference call recorded");
        Ok(calls)
    }
}

/// Calendar day in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Calls recorded for `day`, resetting the stored row when the day changed
fn current_calls(conn: &Connection, day: NaiveDate) -> Result<u32> {
    let row: Option<(String, u32)> = conn
        .query_row(
            "SELECT day, calls FROM rate_limit_state WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let day_str = day.format(DAY_FORMAT).to_string();
    match row {
        Some((stored_day, calls)) if stored_day == day_str => Ok(calls),
        _ => {
            store(conn, day, 0)?;
            Ok(0)
        }
    }
}

fn store(conn: &Connection, day: NaiveDate, calls: u32) -> Result<()> {
    conn.execute(
        "INSERT INTO rate_limit_state (id, day, calls, updated_at)
         VALUES (1, ?1, ?2, CURRENT_TIMESTAMP)
         ON CONFLICT(id) DO UPDATE SET
             day = excluded.day,
             calls = excluded.calls,
             updated_at = excluded.updated_at",
        params![day.format(DAY_FORMAT).to_string(), calls],
    )?;
    Ok(())
}
