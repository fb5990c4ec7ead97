// ==========================================
// Logging initialization
// ==========================================
// tracing + tracing-subscriber
// Level filter comes from RUST_LOG
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber
///
/// # Environment
/// - RUST_LOG: filter directives (default: info)
///   e.g. RUST_LOG=debug or RUST_LOG=repooler::engine=trace
///
/// # Example
/// ```no_run
/// use repooler::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Test subscriber at debug level; safe to call repeatedly
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
