//! Shared tracing/logging initialization.
//!
//! The `mtkey` binary and anything embedding the handshake set up
//! `tracing_subscriber` the same way: an env-filter plus either the
//! human-readable or the JSON formatter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Crates whose events are enabled by the default filter.
const LOG_TARGETS: &[&str] = &["mtkey", "mtkey_client", "mtkey_crypto", "mtkey_proto"];

/// Build the default `RUST_LOG`-style directive for the given level.
///
/// `default_filter("debug")` yields `mtkey=debug,mtkey_client=debug,...`.
pub fn default_filter(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set.
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str, log_json: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    let installed = if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Initialise tracing from the `logging` section of the resolved config.
pub fn init_from_config(logging: &LoggingConfig) -> Result<()> {
    init_tracing(&default_filter(&logging.level), logging.json)
}
