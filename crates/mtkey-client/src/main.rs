//! mtkey CLI
//!
//! Runs the unauthenticated auth-key handshake against a server up to the
//! point where DH parameters have been requested, then prints what was
//! negotiated.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;

use mtkey_client::keys::key_ring_from_config;
use mtkey_client::run_handshake;
use mtkey_core::config::{Config, apply_env_overrides, load_config, load_config_file};
use mtkey_core::tracing_init::init_from_config;

#[derive(Parser, Debug)]
#[command(name = "mtkey")]
#[command(version, about = "mtkey - auth-key handshake client")]
struct Args {
    /// Server address (`host:port`). Overrides the config file.
    #[arg(long)]
    addr: Option<String>,

    /// Read configuration from this file instead of the global and project files.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait for each server response.
    #[arg(long)]
    timeout: Option<u64>,

    /// Log level for mtkey crates (overridden by RUST_LOG).
    #[arg(long, env = "MTKEY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = load_config_file(path)?;
            apply_env_overrides(&mut config, |name| std::env::var(name).ok());
            config
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            load_config(Some(&cwd))?
        }
    };

    if let Some(addr) = &args.addr {
        config.server.address.clone_from(addr);
    }
    if let Some(secs) = args.timeout {
        config.server.response_timeout_secs = secs;
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    config.logging.json |= args.log_json;

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    init_from_config(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.address,
        "Starting mtkey"
    );

    let keys = key_ring_from_config(&config.keys).context("Invalid server key in config")?;
    if keys.is_empty() {
        bail!("No server public keys configured; add at least one entry under \"keys\"");
    }

    let outcome = run_handshake(&config.server, keys).await?;
    info!(
        state = %outcome.state,
        pq = outcome.pq,
        p = outcome.p,
        q = outcome.q,
        fingerprint = %format!("{:016x}", outcome.fingerprint),
        server_time_ms = ?outcome.server_time_ms,
        "Handshake reached DH parameter request"
    );
    Ok(())
}
