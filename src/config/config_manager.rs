// ==========================================
// Repooler - Configuration Manager
// ==========================================
// Responsibility: read planning parameter overrides
// Storage: config_kv table (key-value + scope)
// ==========================================

use crate::config::repool_config::RepoolConfig;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Shares an already configured connection
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Reads one global config value
    ///
    /// # Returns
    /// - Some(String): stored value
    /// - None: key not set
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Writes one global config value
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// Applies stored overrides on top of `config`
    ///
    /// Unparseable values are errors rather than silently ignored.
    pub fn apply_overrides(&self, config: &mut RepoolConfig) -> RepositoryResult<usize> {
        let mut applied = 0;

        if let Some(v) = self.parsed::<u64>(config_keys::TARGET_CLUSTERS)? {
            config.target_clusters = v;
            applied += 1;
        }
        if let Some(v) = self.parsed::<u64>(config_keys::CLUSTERS_PER_LANE)? {
            config.clusters_per_lane = v;
            applied += 1;
        }
        if let Some(v) = self.parsed::<f64>(config_keys::LANE_VOLUME_UL)? {
            config.lane_volume_ul = v;
            applied += 1;
        }
        if let Some(v) = self.parsed::<f64>(config_keys::POOL_EXCESS_UL)? {
            config.pool_excess_ul = v;
            applied += 1;
        }
        if let Some(v) = self.parsed::<f64>(config_keys::MIN_PIPETTE_UL)? {
            config.min_pipette_ul = v;
            applied += 1;
        }
        if let Some(v) = self.parsed::<f64>(config_keys::WELL_CAPACITY_UL)? {
            config.well_capacity_ul = v;
            applied += 1;
        }
        if let Some(v) = self.parsed::<u32>(config_keys::MAX_EXTRA_LANES)? {
            config.max_extra_lanes = v;
            applied += 1;
        }
        if let Some(raw) = self.get_config_value(config_keys::DEST_PLATES)? {
            // JSON array of plate labels
            let plates: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
                RepositoryError::FieldValueError {
                    field: config_keys::DEST_PLATES.to_string(),
                    message: e.to_string(),
                }
            })?;
            config.dest_plates = plates;
            applied += 1;
        }

        info!(applied, "config_kv overrides applied");
        Ok(applied)
    }

    fn parsed<T>(&self, key: &str) -> RepositoryResult<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(None),
        };
        debug!(key, value = %raw, "config override");

        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RepositoryError::FieldValueError {
                field: key.to_string(),
                message: format!("{} ({})", e, raw),
            })
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    pub const TARGET_CLUSTERS: &str = "repool/target_clusters";
    pub const CLUSTERS_PER_LANE: &str = "repool/clusters_per_lane";
    pub const LANE_VOLUME_UL: &str = "repool/lane_volume_ul";
    pub const POOL_EXCESS_UL: &str = "repool/pool_excess_ul";
    pub const MIN_PIPETTE_UL: &str = "repool/min_pipette_ul";
    pub const WELL_CAPACITY_UL: &str = "repool/well_capacity_ul";
    pub const MAX_EXTRA_LANES: &str = "repool/max_extra_lanes";
    pub const DEST_PLATES: &str = "repool/dest_plates"; // JSON array
}
