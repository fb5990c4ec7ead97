// ==========================================
// Repooler - Sequencing Results Store
// ==========================================
// Read-only during planning: per-lane sample yields
// Storage: lane_yield table
// ==========================================

use crate::domain::types::{SampleYield, UNDETERMINED};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

// ==========================================
// Trait: SequencingResultStore
// ==========================================
pub trait SequencingResultStore {
    /// Every yield row of every lane holding at least one sample whose
    /// name contains `project_id` (Undetermined never counts), including co-located samples of other
    /// projects and the Undetermined pseudo-sample.
    fn lane_yields(&self, project_id: &str) -> RepositoryResult<Vec<SampleYield>>;
}

// ==========================================
// LaneYieldRepository - SQLite implementation
// ==========================================
pub struct LaneYieldRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LaneYieldRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Inserts or replaces yields in one transaction
    ///
    /// # Returns
    /// Number of rows written
    pub fn upsert_batch(&self, rows: &[SampleYield]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO lane_yield (flowcell_id, lane_id, sample_name, clusters)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for row in rows {
                let clusters = i64::try_from(row.clusters).map_err(|_| {
                    RepositoryError::FieldValueError {
                        field: "clusters".to_string(),
                        message: format!("{} does not fit in the database", row.clusters),
                    }
                })?;
                written += stmt.execute(params![
                    row.flowcell_id,
                    row.lane_id,
                    row.sample_id,
                    clusters
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(written)
    }
}

impl SequencingResultStore for LaneYieldRepository {
    #[instrument(skip(self))]
    fn lane_yields(&self, project_id: &str) -> RepositoryResult<Vec<SampleYield>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT y.flowcell_id, y.lane_id, y.sample_name, y.clusters
            FROM lane_yield y
            WHERE EXISTS (
                SELECT 1 FROM lane_yield p
                WHERE p.flowcell_id = y.flowcell_id
                  AND p.lane_id = y.lane_id
                  AND instr(p.sample_name, ?1) > 0
                  AND p.sample_name <> ?2
            )
            ORDER BY y.flowcell_id, y.lane_id, y.sample_name
            "#,
        )?;

        let rows = stmt
            .query_map(params![project_id, UNDETERMINED], |row| {
                let clusters: i64 = row.get(3)?;
                Ok(SampleYield {
                    flowcell_id: row.get(0)?,
                    lane_id: row.get(1)?,
                    sample_id: row.get(2)?,
                    clusters: clusters.max(0) as u64,
                })
            })?
            .collect::<SqliteResult<Vec<SampleYield>>>()?;

        debug!(rows = rows.len(), "lane yields loaded");
        Ok(rows)
    }
}
