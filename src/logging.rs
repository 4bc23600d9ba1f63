//! Tracing setup for test binaries
//!
//! The crate only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. [`init`] installs a formatter that writes through
//! the test harness' capture.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives
pub const LOG_ENV: &str = "GRAPH_FIXTURES_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install a fmt subscriber filtered by [`LOG_ENV`] (default `warn`)
///
/// Safe to call from every test; only the first call installs anything.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
