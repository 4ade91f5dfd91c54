//! Structured logging for questline hosts.
//!
//! Built on `tracing` with two output formats:
//!
//! - **Text**: human-friendly output for interactive play
//! - **JSON**: machine-parseable JSON lines for CI and batch checks
//!
//! Initialize once at startup:
//!
//! ```ignore
//! use questline_core::config::LogConfig;
//! use questline_core::logging::init_logging;
//!
//! init_logging(&LogConfig::default())?;
//! ```
//!
//! The library itself only emits events; embedding hosts that already run
//! their own subscriber should skip this module entirely.

use std::io;
use std::sync::OnceLock;

use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogConfig;

/// Global flag to track if logging has been initialized.
static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-friendly output for interactive use.
    Text,
    /// JSON lines for machine consumption.
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected one of: text, json")),
        }
    }
}

/// Error type for logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log format: {0}")]
    InvalidFormat(String),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize the global logging subscriber.
///
/// Call once at application startup; subsequent calls return
/// `Err(LogError::AlreadyInitialized)`. The `RUST_LOG` environment variable
/// overrides the configured level, e.g. `RUST_LOG=questline_core=trace`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let format: LogFormat = config
        .format
        .parse()
        .map_err(|_| LogError::InvalidFormat(config.format.clone()))?;

    // Fall back to the configured level when RUST_LOG is absent
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(true),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .json()
                    .with_timer(SystemTime)
                    .with_writer(io::stderr)
                    .with_target(true)
                    .flatten_event(true),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let _ = LOGGING_INITIALIZED.set(true);

    tracing::info!(
        log_level = %config.level,
        log_format = %format,
        "logging initialized"
    );

    Ok(())
}

/// Check if logging has been initialized.
pub fn is_logging_initialized() -> bool {
    LOGGING_INITIALIZED.get().is_some()
}
