//! Structured logging initialization via `tracing`.

use tracing_subscriber::EnvFilter;

/// Initialize a plain `fmt` subscriber for command-line tools.
///
/// Respects `RUST_LOG`; falls back to `default_filter` when it is unset or
/// unparsable. Calling it twice is harmless.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
