// ==========================================
// Repooler - SQLite Connection Setup
// ==========================================
// Every Connection::open goes through here so PRAGMA behaviour
// and schema creation are the same for all repositories
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version written by `init_schema`
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Environment variable that overrides the default database path
pub const DB_PATH_ENV: &str = "REPOOLER_DB_PATH";

/// Applies the shared PRAGMAs (per connection)
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Opens a connection, configures it and makes sure the schema exists
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates the tables used by the planner (idempotent)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS lane_yield (
            flowcell_id TEXT NOT NULL,
            lane_id TEXT NOT NULL,
            sample_name TEXT NOT NULL,
            clusters INTEGER NOT NULL CHECK (clusters >= 0),
            PRIMARY KEY (flowcell_id, lane_id, sample_name)
        );

        CREATE TABLE IF NOT EXISTS project (
            project_id TEXT PRIMARY KEY,
            project_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sample_location (
            project_id TEXT NOT NULL,
            sample_name TEXT NOT NULL,
            plate_id TEXT NOT NULL,
            well TEXT NOT NULL,
            step_date TEXT NOT NULL,
            PRIMARY KEY (project_id, sample_name, step_date)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Default database location
///
/// `REPOOLER_DB_PATH` wins; otherwise `<data_dir>/repooler/repooler.db`,
/// falling back to `./repooler.db`.
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./repooler.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("repooler");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("repooler.db");
        }
    }

    path.to_string_lossy().to_string()
}
