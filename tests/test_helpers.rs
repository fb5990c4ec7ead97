// ==========================================
// Test helpers
// ==========================================
// Temporary databases seeded through the repositories
// ==========================================
#![allow(dead_code)]

use chrono::NaiveDate;
use repooler::db::open_sqlite_connection;
use repooler::domain::{PlateWell, SampleYield};
use repooler::repository::{LaneYieldRepository, SampleLocationRecord, SampleLocationRepository};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const PROJECT: &str = "P1";
pub const PROJECT_NAME: &str = "Smith_Lab";

/// Creates a temporary database with the schema applied
///
/// # Returns
/// - NamedTempFile: keeps the file alive
/// - Arc<Mutex<Connection>>: shared connection for the repositories
pub fn create_test_db() -> Result<(NamedTempFile, Arc<Mutex<Connection>>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();
    let conn = open_sqlite_connection(&db_path)?;
    Ok((temp_file, Arc::new(Mutex::new(conn))))
}

/// (flowcell, lane, sample, clusters)
pub fn seed_yields(
    conn: &Arc<Mutex<Connection>>,
    rows: &[(&str, &str, &str, u64)],
) -> Result<usize, Box<dyn Error>> {
    let yields: Vec<SampleYield> = rows
        .iter()
        .map(|(fc, lane, sample, clusters)| SampleYield::new(fc, lane, sample, *clusters))
        .collect();
    Ok(LaneYieldRepository::from_connection(conn.clone()).upsert_batch(&yields)?)
}

/// (sample, plate, well), all on the same step date
pub fn seed_locations(
    conn: &Arc<Mutex<Connection>>,
    project_id: &str,
    rows: &[(&str, &str, &str)],
) -> Result<usize, Box<dyn Error>> {
    let step_date = NaiveDate::from_ymd_opt(2026, 1, 12).ok_or("bad date")?;
    let records: Vec<SampleLocationRecord> = rows
        .iter()
        .map(|(sample, plate, well)| SampleLocationRecord {
            project_id: project_id.to_string(),
            sample_name: sample.to_string(),
            location: PlateWell::new(plate, well),
            step_date,
        })
        .collect();

    let repo = SampleLocationRepository::from_connection(conn.clone());
    repo.upsert_project(project_id, PROJECT_NAME)?;
    Ok(repo.upsert_batch(&records)?)
}

/// Two lanes of project P1 plus an unrelated lane of P2
///
/// Lane FC1:1 pools P1_A and P1_B; lane FC1:2 shares P1_C with
/// P2_X; lane FC2:1 holds only P2_Y.
pub fn seed_standard_run(conn: &Arc<Mutex<Connection>>) -> Result<(), Box<dyn Error>> {
    seed_yields(
        conn,
        &[
            ("FC1", "1", "P1_A", 260_000_000),
            ("FC1", "1", "P1_B", 310_000_000),
            ("FC1", "1", "Undetermined", 20_000_000),
            ("FC1", "2", "P1_C", 100_000_000),
            ("FC1", "2", "P2_X", 300_000_000),
            ("FC1", "2", "Undetermined", 15_000_000),
            ("FC2", "1", "P2_Y", 350_000_000),
            ("FC2", "1", "Undetermined", 9_000_000),
        ],
    )?;
    Ok(())
}
