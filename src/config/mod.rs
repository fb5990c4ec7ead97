// ==========================================
// Repooler - Configuration Layer
// ==========================================
// Planning parameters and their database overrides
// ==========================================

pub mod config_manager;
pub mod repool_config;

pub use config_manager::{config_keys, ConfigManager};
pub use repool_config::RepoolConfig;
