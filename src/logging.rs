//! Diagnostic logging for the binary.
//!
//! Shell hooks run after every prompt, so the default filter is `warn` and
//! everything goes to stderr. Set `DIRHIST_LOG=dirhist=debug` to trace
//! retries, schema setup and purges.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "DIRHIST_LOG";
pub const DEFAULT_FILTER: &str = "warn";

/// Build the filter from `DIRHIST_LOG`, falling back to [`DEFAULT_FILTER`]
/// when the variable is unset or unparseable.
pub fn env_filter(value: Option<&str>) -> EnvFilter {
    value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init() {
    let filter = env_filter(std::env::var(LOG_ENV).ok().as_deref());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
