//! Configuration resolution for mtkey.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/mtkey/settings.json)
//! 3. Project config (.mtkey/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Default RSA public exponent.
pub const DEFAULT_EXPONENT: u32 = 65537;

/// Complete mtkey configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Server public keys the handshake is allowed to encrypt to.
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to connect and how long to wait for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` of the server.
    pub address: String,
    /// How long the driver waits for each response (seconds).
    pub response_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "149.154.167.40:443".to_string(),
            response_timeout_secs: 10,
        }
    }
}

/// One server RSA public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Big-endian modulus as a hex string.
    pub modulus: String,
    #[serde(default = "default_exponent")]
    pub exponent: u32,
    /// Hex fingerprint. Computed from the key when absent.
    #[serde(default)]
    pub fingerprint: Option<String>,
}

const fn default_exponent() -> u32 {
    DEFAULT_EXPONENT
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON log lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.server.address.trim().is_empty() {
            return Err(Error::Config("server.address must not be empty".to_string()));
        }
        if self.server.response_timeout_secs == 0 {
            return Err(Error::Config(
                "server.response_timeout_secs must be greater than zero".to_string(),
            ));
        }
        for (index, key) in self.keys.iter().enumerate() {
            if key.modulus.is_empty() || !key.modulus.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::Config(format!("keys[{index}].modulus is not a hex string")));
            }
            if let Some(fp) = &key.fingerprint {
                if u64::from_str_radix(fp, 16).is_err() {
                    return Err(Error::Config(format!(
                        "keys[{index}].fingerprint is not a 64-bit hex value: {fp}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            debug!(path = %global_path.display(), "Loading global config");
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".mtkey").join("settings.json");
        if project_path.exists() {
            debug!(path = %project_path.display(), "Loading project config");
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    config.validate()?;
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mtkey").join("settings.json"))
}

/// Read a single config file without merging.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Layer `overlay` on top of `base`. Keys accumulate; everything else is replaced.
pub fn merge_config(base: &mut Config, overlay: Config) {
    base.server = overlay.server;
    base.logging = overlay.logging;

    for key in overlay.keys {
        if !base.keys.contains(&key) {
            base.keys.push(key);
        }
    }
}

/// Apply `MTKEY_*` overrides. `lookup` resolves a variable name to its value.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("MTKEY_SERVER_ADDR") {
        config.server.address = val;
    }
    if let Some(val) = lookup("MTKEY_RESPONSE_TIMEOUT_SECS") {
        if let Ok(n) = val.parse() {
            config.server.response_timeout_secs = n;
        }
    }
    if let Some(val) = lookup("MTKEY_LOG_LEVEL") {
        config.logging.level = val;
    }
}
