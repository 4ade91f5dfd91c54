//! questline-core: embedding bridge for a quest-style interactive-fiction
//! interpreter.
//!
//! The bridge sits between a host application (CLI, UI, bot) and an
//! interpreter implementing the [`Engine`] trait. Hosts drive the game
//! through a [`Session`]; the interpreter reaches back into the host through
//! registered callbacks, which receive a live [`SessionCtx`] and may
//! re-enter the bridge.
//!
//! # Architecture
//!
//! ```text
//! Host ── operations ──▶ Session ── guard ──▶ Engine
//!   ▲                                           │
//!   └──── callbacks (re-entrant SessionCtx) ◀───┘
//! ```
//!
//! Every operation that may run script code passes the guard: reject while a
//! fault is latched, clear the old report, reject while execution is
//! disabled, delegate to the engine, re-check for a fault, then optionally
//! ask the host for a view refresh. Reads ([`Snapshot`]) are pure and bypass
//! all of it.
//!
//! # Modules
//!
//! - `session`: session lifecycle and the guarded operation surface
//! - `engine`: the [`Engine`] trait and its value types
//! - `callbacks`: the typed host-callback registry and dispatch
//! - `snapshot`: read models exported to the host
//! - `scripted`: the built-in deterministic interpreter
//! - `serialize`: save/load buffer padding rules
//! - `error`: error taxonomy for the host boundary
//! - `error_codes`: the historical script fault table
//! - `config`: host configuration (TOML)
//! - `logging`: `tracing` subscriber setup for hosts that want it
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod callbacks;
pub mod config;
pub mod engine;
pub mod error;
pub mod error_codes;
mod guard;
pub mod logging;
pub mod scripted;
pub mod serialize;
pub mod session;
pub mod snapshot;

pub use callbacks::{Callback, CallbackKind, CallbackTable};
pub use config::{HostConfig, LogConfig, SessionConfig};
pub use engine::{Engine, MenuItem, Value, WindowKind, hooks};
pub use error::{ConfigError, GuardedError, SelectError, SerializeError, VariableError};
pub use error_codes::{FaultCode, describe};
pub use scripted::ScriptedEngine;
pub use session::{EngineCtx, Session, SessionCtx};
pub use snapshot::{ErrorReport, ExecutionState, ListEntry, Snapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
