//! Tracing subscriber initialization.

/// Install the global `fmt` subscriber.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
