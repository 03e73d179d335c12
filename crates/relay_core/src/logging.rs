//! Tracing subscriber setup.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global tracing subscriber.
///
/// # Arguments
///
/// * `level` - Filter used when `RUST_LOG` is unset (e.g. "info", "relay_core=debug")
/// * `json` - Emit one JSON object per line instead of human-readable text
///
/// # Returns
///
/// An error if `level` is not a valid filter or a subscriber is already
/// installed.
///
/// # Example
///
/// ```no_run
/// relay_core::logging::setup_logging("info", false).expect("logging");
/// ```
pub fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("invalid log filter '{}': {}", level, e))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json().with_target(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    result.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}
