//! Host configuration.
//!
//! Handles loading and validation of questline.toml configuration files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Session behavior.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging output.
    #[serde(default)]
    pub log: LogConfig,
}

/// Session behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether a latched script fault blocks further guarded calls until the
    /// session is rebuilt.
    #[serde(default = "default_true")]
    pub exit_on_error: bool,

    /// Start the engine with debug mode enabled.
    #[serde(default)]
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exit_on_error: true,
            debug: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl HostConfig {
    /// Loads configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }
}
