//! Logger initialization

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Defaults to `info` and can be overridden with `RUST_LOG`.
pub fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false)
        .init();
}
