//! The execution guard.
//!
//! Every operation that may run script code brackets the engine call with the
//! same sequence:
//!
//! 1. if a prior fault is still latched (and the session is configured to
//!    stop on faults) → reject without touching the engine;
//! 2. clear the error report and tell the engine a run is beginning, which
//!    also clears the per-run changed flags;
//! 3. if execution is disabled → reject;
//! 4. run the per-operation engine primitive;
//! 5. if a fault was reported during the run → fail, leaving the report
//!    latched for [`Snapshot::last_error`](crate::snapshot::Snapshot);
//! 6. on success, optionally ask the host for an incremental view refresh.
//!
//! This module is steps 1–3 ([`enter`]) and step 5 ([`check_fault`]); the
//! per-operation step 4 and the step-6 refresh live in
//! [`session`](crate::session). Note the ordering of steps 2 and 3: a call
//! rejected because execution is disabled has still cleared the previous
//! report.

use tracing::{debug, trace};

use crate::engine::Engine;
use crate::error::GuardedError;
use crate::session::SessionState;

/// Guard steps 1–3. On `Ok`, the report is clear and the engine is prepared
/// for a run.
pub(crate) fn enter(
    state: &mut SessionState,
    engine: &mut dyn Engine,
) -> Result<(), GuardedError> {
    if state.exit_on_error && state.last_error.is_set() {
        debug!(code = state.last_error.code, "guarded call rejected, prior fault latched");
        return Err(GuardedError::PriorErrorLatched);
    }
    state.last_error.clear();
    engine.begin_run();
    if state.exec_disabled {
        debug!("guarded call rejected, execution disabled");
        return Err(GuardedError::ExecutionDisabled);
    }
    Ok(())
}

/// Guard step 5. The report stays latched on failure; the next successful
/// [`enter`] clears it.
pub(crate) fn check_fault(state: &SessionState) -> Result<(), GuardedError> {
    if state.last_error.is_set() {
        trace!(code = state.last_error.code, "guarded call finished with a fault");
        return Err(GuardedError::RuntimeFault {
            code: state.last_error.code,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedEngine;
    use crate::snapshot::ErrorReport;

    fn latched_state() -> SessionState {
        let mut state = SessionState::new(true);
        state.last_error = ErrorReport {
            code: 118,
            location: Some("INTRO".to_owned()),
            action_index: None,
            line: 4,
        };
        state
    }

    // --- enter ---

    #[test]
    fn clean_state_enters() {
        let mut state = SessionState::new(true);
        let mut engine = ScriptedEngine::new();
        assert_eq!(enter(&mut state, &mut engine), Ok(()));
        assert!(!state.last_error.is_set());
    }

    #[test]
    fn latched_fault_rejects_and_stays_visible() {
        let mut state = latched_state();
        let mut engine = ScriptedEngine::new();
        assert_eq!(
            enter(&mut state, &mut engine),
            Err(GuardedError::PriorErrorLatched)
        );
        assert_eq!(state.last_error.code, 118);
        assert_eq!(state.last_error.line, 4);
    }

    #[test]
    fn latch_check_is_skipped_when_not_exiting_on_error() {
        let mut state = latched_state();
        state.exit_on_error = false;
        let mut engine = ScriptedEngine::new();
        assert_eq!(enter(&mut state, &mut engine), Ok(()));
        assert!(!state.last_error.is_set(), "entering clears the old report");
    }

    #[test]
    fn disabled_execution_rejects_after_clearing_the_report() {
        let mut state = SessionState::new(false);
        state.last_error.code = 111;
        state.exec_disabled = true;
        let mut engine = ScriptedEngine::new();
        assert_eq!(
            enter(&mut state, &mut engine),
            Err(GuardedError::ExecutionDisabled)
        );
        // the clear in step 2 happens before the disable check in step 3
        assert!(!state.last_error.is_set());
    }

    // --- check_fault ---

    #[test]
    fn clean_run_passes_the_post_check() {
        let state = SessionState::new(true);
        assert_eq!(check_fault(&state), Ok(()));
    }

    #[test]
    fn reported_fault_fails_the_post_check_and_stays_latched() {
        let state = latched_state();
        assert_eq!(
            check_fault(&state),
            Err(GuardedError::RuntimeFault { code: 118 })
        );
        assert!(state.last_error.is_set());
    }
}
