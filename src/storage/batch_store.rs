//! Persistence for the last completed batch run.
//!
//! Payloads are stored as JSON so the store does not depend on the batch
//! result shape.

use chrono::Utc;
use rusqlite::params;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use super::SharedDatabase;
use crate::types::{Result, log_filter_warn};

#[derive(Debug, Clone)]
pub struct BatchResultStore {
    db: SharedDatabase,
}

impl BatchResultStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Replace the stored run with `results`, keeping their order.
    /// `id_of` supplies the per-result key.
    pub fn replace_run<T, F>(&self, run_id: &str, results: &[T], id_of: F) -> Result<usize>
    where
        T: Serialize,
        F: Fn(&T) -> String,
    {
        let rows = results
            .iter()
            .map(|result| -> Result<(String, String)> {
                Ok((id_of(result), serde_json::to_string(result)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let run = run_id.to_string();
        let stored_at = Utc::now().to_rfc3339();
        let count = self.db.transaction(move |conn| {
            conn.execute("DELETE FROM batch_results", [])?;
            let mut stmt = conn.prepare(
                "INSERT INTO batch_results (id, position, run_id, payload, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     position = excluded.position,
                     payload = excluded.payload",
            )?;
            for (position, (id, payload)) in rows.iter().enumerate() {
                stmt.execute(params![id, position as i64, run, payload, stored_at])?;
            }
            Ok(rows.len())
        })?;

        info!(run_id, count, "Batch results persisted");
        Ok(count)
    }

    /// Load the stored run in order. Rows that no longer deserialize are skipped.
    pub fn load_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare("SELECT payload FROM batch_results ORDER BY position ASC")?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let results: Vec<T> = payloads
            .iter()
            .filter_map(|payload| {
                log_filter_warn(
                    serde_json::from_str(payload),
                    "Skipping unreadable batch result",
                )
            })
            .collect();

        debug!(count = results.len(), "Loaded cached batch results");
        Ok(results)
    }
}
