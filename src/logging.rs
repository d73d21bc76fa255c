//! Tracing setup for the `unfurler` binary and embedding applications.
//!
//! Structured fields used across the crate: `worker`, `job_id`, `link_id`,
//! `url`, `kind`, `duration_ms`, `error`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "unfurler=info";

/// Installs a global fmt subscriber. `RUST_LOG` selects the filter and
/// `LOG_FORMAT=json` switches to JSON lines. Calling it twice is harmless.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_ok() {
        tracing::debug!(json, "Logging initialized");
    }
}
