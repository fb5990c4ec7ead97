// ==========================================
// Repooler - Sample Location Directory
// ==========================================
// Where each sample sits after its most recent normalization step
// Storage: sample_location + project tables
// ==========================================

use crate::domain::types::PlateWell;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// Trait: SampleLocationDirectory
// ==========================================
pub trait SampleLocationDirectory {
    /// Plate and well of the sample's latest normalization output
    fn locate(&self, project_id: &str, sample: &str) -> RepositoryResult<Option<PlateWell>>;

    /// Human readable project name, when registered
    fn project_name(&self, project_id: &str) -> RepositoryResult<Option<String>>;
}

/// One normalization output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLocationRecord {
    pub project_id: String,
    pub sample_name: String,
    pub location: PlateWell,
    pub step_date: NaiveDate,
}

// ==========================================
// SampleLocationRepository - SQLite implementation
// ==========================================
pub struct SampleLocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SampleLocationRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Inserts or replaces location rows in one transaction
    pub fn upsert_batch(&self, records: &[SampleLocationRecord]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO sample_location
                    (project_id, sample_name, plate_id, well, step_date)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for record in records {
                written += stmt.execute(params![
                    record.project_id,
                    record.sample_name,
                    record.location.plate_id,
                    record.location.well,
                    record.step_date.format("%Y-%m-%d").to_string(),
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(written)
    }

    pub fn upsert_project(&self, project_id: &str, project_name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO project (project_id, project_name) VALUES (?1, ?2)",
            params![project_id, project_name],
        )?;
        Ok(())
    }
}

impl SampleLocationDirectory for SampleLocationRepository {
    fn locate(&self, project_id: &str, sample: &str) -> RepositoryResult<Option<PlateWell>> {
        let conn = self.get_conn()?;
        let location = conn
            .query_row(
                r#"
                SELECT plate_id, well
                FROM sample_location
                WHERE project_id = ?1 AND sample_name = ?2
                ORDER BY step_date DESC
                LIMIT 1
                "#,
                params![project_id, sample],
                |row| {
                    Ok(PlateWell {
                        plate_id: row.get(0)?,
                        well: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(location)
    }

    fn project_name(&self, project_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let name = conn
            .query_row(
                "SELECT project_name FROM project WHERE project_id = ?1",
                params![project_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(name)
    }
}
