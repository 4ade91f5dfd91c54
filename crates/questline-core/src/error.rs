//! Error types for the embedding bridge.
//!
//! The taxonomy mirrors the host boundary: guard rejections and runtime
//! faults ([`GuardedError`]), selection range checks ([`SelectError`]),
//! variable reads ([`VariableError`]), save/load marshalling
//! ([`SerializeError`]), and host configuration ([`ConfigError`]).
//!
//! Guard rejections never write a new fault report; runtime faults stay
//! latched in the session until the next successful guard pass clears them.
//! None of these is ever surfaced as a panic.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a guarded operation (anything that may run script code).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardedError {
    /// A prior fault is still latched and the session exits on error; the
    /// operation was not attempted and the prior report is untouched.
    #[error("a prior script fault is still latched")]
    PriorErrorLatched,

    /// Script execution is administratively disabled for this session;
    /// read-only queries remain valid.
    #[error("script execution is disabled")]
    ExecutionDisabled,

    /// The engine reported a fault while running; the full report stays
    /// latched and is readable via `last_error`, with `code` described by
    /// [`crate::error_codes::describe`].
    #[error("script fault {code}")]
    RuntimeFault {
        /// Raw interpreter fault code.
        code: i32,
    },
}

impl GuardedError {
    /// Raw fault code, when this failure came out of the engine.
    #[must_use]
    pub fn fault_code(&self) -> Option<i32> {
        match self {
            GuardedError::RuntimeFault { code } => Some(*code),
            GuardedError::PriorErrorLatched | GuardedError::ExecutionDisabled => None,
        }
    }
}

/// Failure while setting the selected action or object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    /// Requested index is outside `[0, count)`; the selection hook was not
    /// invoked.
    #[error("selection index {index} out of range (count {count})")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Current list length.
        count: usize,
    },

    /// The selection hook location failed the guard protocol.
    #[error(transparent)]
    Guard(#[from] GuardedError),
}

/// Failure of a variable read.
///
/// Variable reads are pure: they never run the guard and never touch the
/// latched fault report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    /// The name did not resolve to a variable.
    #[error("variable `{name}` not found")]
    NotFound {
        /// Requested variable name.
        name: String,
    },

    /// The index is outside `[0, values_count)` for a variable that exists.
    #[error("index {index} out of range for variable with {count} values")]
    IndexOutOfRange {
        /// Requested element index.
        index: usize,
        /// Number of values the variable holds.
        count: usize,
    },
}

/// Failure while marshalling interpreter state to or from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    /// The engine produced a zero-length state snapshot.
    #[error("engine reported an empty state snapshot")]
    EmptyState,

    /// The operation failed the guard protocol before or after delegating.
    #[error(transparent)]
    Guard(#[from] GuardedError),
}

/// Failure while loading host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the expected schema.
    #[error("failed to parse config file {path}")]
    Parse {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}
