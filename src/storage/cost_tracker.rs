//! Daily token/cost accumulator, independent of the rate limiter.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

use super::SharedDatabase;
use super::rate_limiter::today;
use crate::ai::cost::Pricing;
use crate::types::{Result, TokenCount};

/// Cumulative spend for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostState {
    pub date: NaiveDate,
    pub tokens: u64,
    pub cost: String,
}

#[derive(Debug, Clone)]
pub struct CostTracker {
    db: SharedDatabase,
    pricing: Pricing,
}

impl CostTracker {
    pub fn new(db: SharedDatabase, pricing: Pricing) -> Self {
        Self { db, pricing }
    }

    /// Add the tokens of one successful inference call
    pub fn add(&self, tokens: TokenCount) -> Result<CostState> {
        self.add_on(today(), tokens)
    }

    pub fn add_on(&self, day: NaiveDate, tokens: TokenCount) -> Result<CostState> {
        let pricing = self.pricing;
        let state = self.db.transaction(move |conn| {
            let current = load(conn, day)?;
            let total = TokenCount::new(current).saturating_add(tokens);
            let state = CostState {
                date: day,
                tokens: total.get(),
                cost: pricing.calculate_cost(total),
            };
            save(conn, &state)?;
            Ok(state)
        })?;

        debug!(
            tokens_today = state.tokens,
            cost_today = %state.cost,
            "Inference cost recorded"
        );
        Ok(state)
    }

    /// Today's totals
    pub fn current(&self) -> Result<CostState> {
        self.current_on(today())
    }

    pub fn current_on(&self, day: NaiveDate) -> Result<CostState> {
        let pricing = self.pricing;
        self.db.transaction(move |conn| {
            let tokens = load(conn, day)?;
            Ok(CostState {
                date: day,
                tokens,
                cost: pricing.calculate_cost(TokenCount::new(tokens)),
            })
        })
    }
}

/// Tokens stored for `day`; a stale row is reset in place
fn load(conn: &Connection, day: NaiveDate) -> Result<u64> {
    let row: Option<(String, i64)> = conn
        .query_row("SELECT day, tokens FROM cost_state WHERE id = 1", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    match row {
        Some((stored_day, tokens)) if stored_day == day.to_string() => Ok(tokens.max(0) as u64),
        _ => {
            save(
                conn,
                &CostState {
                    date: day,
                    tokens: 0,
                    cost: crate::ai::cost::format_cost(0.0),
                },
            )?;
            Ok(0)
        }
    }
}

fn save(conn: &Connection, state: &CostState) -> Result<()> {
    conn.execute(
        "INSERT INTO cost_state (id, day, tokens, cost, updated_at)
         VALUES (1, ?1, ?2, ?3, CURRENT_TIMESTAMP)
         ON CONFLICT(id) DO UPDATE SET
             day = excluded.day,
             tokens = excluded.tokens,
             cost = excluded.cost,
             updated_at = excluded.updated_at",
        params![
            state.date.to_string(),
            i64::try_from(state.tokens).unwrap_or(i64::MAX),
            state.cost
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use std::sync::Arc;

    fn tracker() -> CostTracker {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        CostTracker::new(Arc::new(db), Pricing::default())
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_accumulates_within_day() {
        let tracker = tracker();
        let d = day("2025-06-01");
        tracker.add_on(d, TokenCount::new(600_000)).unwrap();
        let state = tracker.add_on(d, TokenCount::new(400_000)).unwrap();

        assert_eq!(state.tokens, 1_000_000);
        assert_eq!(state.cost, "0.285000");
        assert_eq!(tracker.current_on(d).unwrap(), state);
    }

    #[test]
    fn test_resets_on_new_day() {
        let tracker = tracker();
        tracker.add_on(day("2025-06-01"), TokenCount::new(5000)).unwrap();

        let next = tracker.current_on(day("2025-06-02")).unwrap();
        assert_eq!(next.tokens, 0);
        assert_eq!(next.cost, "0.000000");

        let state = tracker.add_on(day("2025-06-02"), TokenCount::new(1000)).unwrap();
        assert_eq!(state.tokens, 1000);
    }
}
