//! Session builders and shared world sources.
//!
//! Every builder returns a session with the world loaded and the entry
//! location already run, so tests start from a rendered first scene.

use questline_core::{CallbackTable, ScriptedEngine, Session, SessionConfig};

// ---------------------------------------------------------------------------
// World sources
// ---------------------------------------------------------------------------

/// Two locations, two actions, one carried object. The default playground.
pub const CROSSROADS: &str = "\
= START
print You stand at a crossroads.
act North|goto CHAPEL
act South|TOLL = TOLL + 1
obj Lantern
= CHAPEL
print A ruined chapel. Moss everywhere.
act Back|goto START
";

/// First action is harmless, second one divides by zero.
pub const TRAPPED: &str = "\
= START
print A pressure plate clicks underfoot.
act Step off|SAFE = 1
act Cut the wire|BOOM = 1 / 0
";

// ---------------------------------------------------------------------------
// Session builders
// ---------------------------------------------------------------------------

/// Builds a session over `world`, loads it as `fixture.ql`, and runs the
/// entry location.
pub fn session(world: &str, callbacks: CallbackTable, exit_on_error: bool) -> Session {
    let config = SessionConfig {
        exit_on_error,
        ..SessionConfig::default()
    };
    let mut session = Session::new(Box::new(ScriptedEngine::new()), callbacks, &config);
    session
        .load_world_from_buffer(world.as_bytes(), "fixture.ql")
        .unwrap();
    session.restart(false).unwrap();
    session
}

/// [`CROSSROADS`] session that latches faults until torn down.
pub fn strict() -> Session {
    session(CROSSROADS, CallbackTable::new(), true)
}

/// [`CROSSROADS`] session that clears a fault on the next guarded call.
pub fn forgiving() -> Session {
    session(CROSSROADS, CallbackTable::new(), false)
}

/// Session with no world loaded.
pub fn empty(exit_on_error: bool) -> Session {
    let config = SessionConfig {
        exit_on_error,
        ..SessionConfig::default()
    };
    Session::new(Box::new(ScriptedEngine::new()), CallbackTable::new(), &config)
}
