//! Configuration loading for Wikno services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`<PREFIX>__section__key`)
//! 2. Config file (`<file_prefix>.toml`, optional)
//! 3. Serde defaults on the service's config struct

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Result, WiknoError};

/// Load a service configuration struct from an optional file plus env vars.
pub fn load_config<T: DeserializeOwned>(file_prefix: &str, env_prefix: &str) -> Result<T> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| WiknoError::invalid(format!("config: {e}")))?;

    cfg.try_deserialize::<T>()
        .map_err(|e| WiknoError::invalid(format!("config: {e}")))
}

/// Logging section shared by both binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default = "default_true")]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: true,
        }
    }
}
