//! Session lifecycle and the guarded operation surface.
//!
//! A [`Session`] owns the three things the bridge is responsible for: the
//! mutable bridge state ([`SessionState`]), the host's
//! [`CallbackTable`](crate::callbacks::CallbackTable), and the boxed
//! [`Engine`]. Every operation is implemented on [`SessionCtx`], a borrowed
//! view over those three parts; `Session` methods delegate by building one.
//! The same view is what host callback handlers receive, so a handler that
//! re-enters the bridge runs the exact same code against the exact same
//! state — nested calls observe live flags, never a stale copy.
//!
//! [`EngineCtx`] is the narrower surface handed to the engine while it runs:
//! fault reporting, the execution-halt switch, and the `call_*` dispatch
//! methods from [`callbacks`](crate::callbacks).

use tracing::{debug, info, trace};

use crate::callbacks::{Callback, CallbackKind, CallbackTable};
use crate::config::SessionConfig;
use crate::engine::{hooks, Engine, Value, WindowKind};
use crate::error::{GuardedError, SelectError, SerializeError};
use crate::guard;
use crate::serialize;
use crate::snapshot::{ErrorReport, Snapshot};

/// Bridge-owned mutable state: the latched fault report, the execution
/// flags, and the callback re-entry depth. One per session, no globals.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) last_error: ErrorReport,
    pub(crate) exec_disabled: bool,
    pub(crate) exit_on_error: bool,
    pub(crate) callback_depth: u32,
}

impl SessionState {
    pub(crate) fn new(exit_on_error: bool) -> Self {
        Self {
            last_error: ErrorReport::default(),
            exec_disabled: false,
            exit_on_error,
            callback_depth: 0,
        }
    }
}

/// What the engine sees while it runs: fault reporting, the execution-halt
/// switch, and the host callback dispatch methods.
pub struct EngineCtx<'a> {
    pub(crate) state: &'a mut SessionState,
    pub(crate) callbacks: &'a mut CallbackTable,
}

impl EngineCtx<'_> {
    /// Latches a fault report. The first report of a run wins; later ones
    /// are dropped so the original fault stays visible to the host.
    pub fn report_fault(
        &mut self,
        code: i32,
        location: Option<&str>,
        action_index: Option<usize>,
        line: usize,
    ) {
        if self.state.last_error.is_set() {
            trace!(code, "fault already latched, keeping the first report");
            return;
        }
        debug!(code, location, line, "script fault reported");
        self.state.last_error = ErrorReport {
            code,
            location: location.map(str::to_owned),
            action_index,
            line,
        };
    }

    /// Whether a fault has been reported during the current run.
    #[must_use]
    pub fn fault_latched(&self) -> bool {
        self.state.last_error.is_set()
    }

    /// Halts this run and every later guarded call on the session. There is
    /// no switch back: the flag clears only with a fresh session.
    pub fn disable_execution(&mut self) {
        debug!("execution disabled by the engine");
        self.state.exec_disabled = true;
    }

    /// Whether execution has been halted; engines check this between
    /// statements so a halt inside a nested run unwinds the outer ones.
    #[must_use]
    pub fn execution_disabled(&self) -> bool {
        self.state.exec_disabled
    }

    /// Number of host callback frames currently on the stack.
    #[must_use]
    pub fn callback_depth(&self) -> u32 {
        self.state.callback_depth
    }
}

/// The live session as seen from inside a host callback handler, and the
/// place every bridge operation is actually implemented.
pub struct SessionCtx<'a> {
    pub(crate) state: &'a mut SessionState,
    pub(crate) callbacks: &'a mut CallbackTable,
    pub(crate) engine: &'a mut dyn Engine,
}

impl SessionCtx<'_> {
    /// Fresh read-only view of the current bridge and engine state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            state: self.state,
            engine: &*self.engine,
        }
    }

    /// Guard steps 1–3, the per-operation step 4 closure, step 5, and the
    /// optional step-6 refresh.
    fn run_guarded<R>(
        &mut self,
        refresh: bool,
        run: impl FnOnce(&mut dyn Engine, &mut EngineCtx<'_>) -> R,
    ) -> Result<R, GuardedError> {
        guard::enter(self.state, &mut *self.engine)?;
        let out = {
            let mut ctx = EngineCtx {
                state: &mut *self.state,
                callbacks: &mut *self.callbacks,
            };
            run(&mut *self.engine, &mut ctx)
        };
        guard::check_fault(self.state)?;
        if refresh {
            let mut ctx = EngineCtx {
                state: &mut *self.state,
                callbacks: &mut *self.callbacks,
            };
            ctx.call_refresh_int(&mut *self.engine);
        }
        Ok(out)
    }

    /// Runs a code fragment.
    pub fn exec_string(&mut self, code: &str, refresh: bool) -> Result<(), GuardedError> {
        debug!(bytes = code.len(), refresh, "running code fragment");
        self.run_guarded(refresh, |engine, ctx| engine.run_code(ctx, code))
    }

    /// Runs a named location with no arguments.
    pub fn exec_location(&mut self, name: &str, refresh: bool) -> Result<(), GuardedError> {
        debug!(name, refresh, "running location");
        self.run_guarded(refresh, |engine, ctx| engine.run_location(ctx, name, &[]))
    }

    /// Runs the per-tick handler. A tick that arrives while a host callback
    /// is in progress reports success without running anything, so the
    /// handler can never fire while the engine is suspended inside the host.
    pub fn exec_counter(&mut self, refresh: bool) -> Result<(), GuardedError> {
        if self.state.callback_depth > 0 {
            trace!("tick ignored inside a host callback");
            return Ok(());
        }
        self.run_guarded(refresh, |engine, ctx| engine.run_hook(ctx, hooks::COUNTER))
    }

    /// Runs the input-line handler for the text stored via
    /// [`Self::set_input_text`].
    pub fn exec_user_input(&mut self, refresh: bool) -> Result<(), GuardedError> {
        self.run_guarded(refresh, |engine, ctx| engine.run_hook(ctx, hooks::USER_INPUT))
    }

    /// Runs the code of the currently selected action; success without a
    /// selection is a no-op.
    pub fn execute_selected_action(&mut self, refresh: bool) -> Result<(), GuardedError> {
        let Some(index) = self.engine.selected_action() else {
            trace!("no action selected, nothing to execute");
            return Ok(());
        };
        debug!(index, "running selected action");
        self.run_guarded(refresh, |engine, ctx| engine.run_action(ctx, index))
    }

    /// Records the selected action and runs the selection hook. Re-selecting
    /// the current index is a no-op; an out-of-range index fails the range
    /// check before the guard, without invoking the hook.
    pub fn set_selected_action(&mut self, index: usize, refresh: bool) -> Result<(), SelectError> {
        if self.engine.selected_action() == Some(index) {
            trace!(index, "action already selected");
            return Ok(());
        }
        let count = self.engine.actions().len();
        if index >= count {
            return Err(SelectError::OutOfRange { index, count });
        }
        self.run_guarded(refresh, |engine, ctx| {
            engine.set_selected_action(Some(index));
            engine.run_hook(ctx, hooks::ON_ACTION_SELECTED);
        })?;
        Ok(())
    }

    /// Records the selected object and runs the selection hook; same rules
    /// as [`Self::set_selected_action`].
    pub fn set_selected_object(&mut self, index: usize, refresh: bool) -> Result<(), SelectError> {
        if self.engine.selected_object() == Some(index) {
            trace!(index, "object already selected");
            return Ok(());
        }
        let count = self.engine.objects().len();
        if index >= count {
            return Err(SelectError::OutOfRange { index, count });
        }
        self.run_guarded(refresh, |engine, ctx| {
            engine.set_selected_object(Some(index));
            engine.run_hook(ctx, hooks::ON_OBJECT_SELECTED);
        })?;
        Ok(())
    }

    /// Runs the target location of menu row `index` with a single numeric
    /// argument `index + 1`. An out-of-range index is a no-op.
    pub fn select_menu_item(&mut self, index: usize) -> Result<(), GuardedError> {
        let Some(item) = self.engine.menu_items().get(index) else {
            trace!(index, "menu selection out of range, ignoring");
            return Ok(());
        };
        let target = item.target.clone();
        let ordinal = i32::try_from(index + 1).unwrap_or(i32::MAX);
        debug!(index, target, "menu row selected");
        self.run_guarded(false, |engine, ctx| {
            engine.run_location(ctx, &target, &[Value::Int(ordinal)])
        })
    }

    /// Restores the loaded world's initial state and runs its entry point.
    pub fn restart(&mut self, refresh: bool) -> Result<(), GuardedError> {
        debug!("restarting game");
        self.run_guarded(refresh, |engine, ctx| engine.restart(ctx))
    }

    /// Serializes the full engine state into a host-owned buffer sized
    /// exactly to the encoded length.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, SerializeError> {
        let bytes = self.run_guarded(false, |engine, ctx| engine.save_status(ctx))?;
        if bytes.is_empty() {
            return Err(SerializeError::EmptyState);
        }
        debug!(len = bytes.len(), "state saved to buffer");
        Ok(bytes)
    }

    /// Restores engine state from a buffer produced by
    /// [`Self::save_to_buffer`]. The engine decodes from a working copy
    /// over-allocated by one zeroed terminator unit.
    pub fn load_from_buffer(&mut self, bytes: &[u8], refresh: bool) -> Result<(), SerializeError> {
        let padded = serialize::pad_status_buffer(bytes, self.engine.status_unit_width());
        debug!(len = bytes.len(), padded = padded.len(), "loading state from buffer");
        self.run_guarded(refresh, |engine, ctx| engine.load_status(ctx, &padded))?;
        Ok(())
    }

    /// Loads a game definition from raw bytes, recording `source_name` as
    /// its origin. The engine decodes from a working copy padded with
    /// [`serialize::WORLD_PADDING_BYTES`] zero bytes.
    pub fn load_world_from_buffer(
        &mut self,
        bytes: &[u8],
        source_name: &str,
    ) -> Result<(), SerializeError> {
        let padded = serialize::pad_world_buffer(bytes);
        debug!(len = bytes.len(), source_name, "loading world from buffer");
        self.run_guarded(false, |engine, ctx| {
            engine.load_world(ctx, &padded, source_name);
        })?;
        Ok(())
    }

    /// Stores the pending input-line text; a plain engine write, not a
    /// guarded call. [`Self::exec_user_input`] hands it to the script.
    pub fn set_input_text(&mut self, text: &str) {
        self.engine.set_input_text(text);
    }

    /// Sets a window pane's visibility; a plain engine write.
    pub fn set_window_visible(&mut self, kind: WindowKind, visible: bool) {
        self.engine.set_window_visible(kind, visible);
    }

    /// Enables or disables the engine's debug mode.
    pub fn set_debug(&mut self, enabled: bool) {
        self.engine.set_debug(enabled);
    }

    /// Installs a callback handler, replacing any previous one of the same
    /// kind. A handler may re-register its own kind from inside a call.
    pub fn register_callback(&mut self, callback: Callback) {
        self.callbacks.register(callback);
    }

    /// Whether a handler is installed for `kind`.
    #[must_use]
    pub fn is_callback_registered(&self, kind: CallbackKind) -> bool {
        self.callbacks.is_registered(kind)
    }
}

/// One embedding session: bridge state, callback table, and the engine.
///
/// Built by [`Session::new`], torn down by [`Session::terminate`]. While a
/// fault is latched and the session stops on faults (see
/// [`SessionConfig::exit_on_error`]), every guarded call fails with
/// [`GuardedError::PriorErrorLatched`]; recovery is a fresh session.
pub struct Session {
    state: SessionState,
    callbacks: CallbackTable,
    engine: Box<dyn Engine>,
}

impl Session {
    /// Builds a fresh session: bridge state cleared, the callback table
    /// installed as provided (missing kinds stay neutral), and the engine
    /// reset to its defaults.
    #[must_use]
    pub fn new(mut engine: Box<dyn Engine>, callbacks: CallbackTable, config: &SessionConfig) -> Self {
        engine.reset();
        engine.set_debug(config.debug);
        info!(
            version = engine.version(),
            callbacks = callbacks.registered_count(),
            exit_on_error = config.exit_on_error,
            "session initialized"
        );
        Self {
            state: SessionState::new(config.exit_on_error),
            callbacks,
            engine,
        }
    }

    fn ctx(&mut self) -> SessionCtx<'_> {
        SessionCtx {
            state: &mut self.state,
            callbacks: &mut self.callbacks,
            engine: &mut *self.engine,
        }
    }

    /// Fresh read-only view of the current bridge and engine state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            state: &self.state,
            engine: &*self.engine,
        }
    }

    /// See [`SessionCtx::exec_string`].
    pub fn exec_string(&mut self, code: &str, refresh: bool) -> Result<(), GuardedError> {
        self.ctx().exec_string(code, refresh)
    }

    /// See [`SessionCtx::exec_location`].
    pub fn exec_location(&mut self, name: &str, refresh: bool) -> Result<(), GuardedError> {
        self.ctx().exec_location(name, refresh)
    }

    /// See [`SessionCtx::exec_counter`].
    pub fn exec_counter(&mut self, refresh: bool) -> Result<(), GuardedError> {
        self.ctx().exec_counter(refresh)
    }

    /// See [`SessionCtx::exec_user_input`].
    pub fn exec_user_input(&mut self, refresh: bool) -> Result<(), GuardedError> {
        self.ctx().exec_user_input(refresh)
    }

    /// See [`SessionCtx::execute_selected_action`].
    pub fn execute_selected_action(&mut self, refresh: bool) -> Result<(), GuardedError> {
        self.ctx().execute_selected_action(refresh)
    }

    /// See [`SessionCtx::set_selected_action`].
    pub fn set_selected_action(&mut self, index: usize, refresh: bool) -> Result<(), SelectError> {
        self.ctx().set_selected_action(index, refresh)
    }

    /// See [`SessionCtx::set_selected_object`].
    pub fn set_selected_object(&mut self, index: usize, refresh: bool) -> Result<(), SelectError> {
        self.ctx().set_selected_object(index, refresh)
    }

    /// See [`SessionCtx::select_menu_item`].
    pub fn select_menu_item(&mut self, index: usize) -> Result<(), GuardedError> {
        self.ctx().select_menu_item(index)
    }

    /// See [`SessionCtx::restart`].
    pub fn restart(&mut self, refresh: bool) -> Result<(), GuardedError> {
        self.ctx().restart(refresh)
    }

    /// See [`SessionCtx::save_to_buffer`].
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, SerializeError> {
        self.ctx().save_to_buffer()
    }

    /// See [`SessionCtx::load_from_buffer`].
    pub fn load_from_buffer(&mut self, bytes: &[u8], refresh: bool) -> Result<(), SerializeError> {
        self.ctx().load_from_buffer(bytes, refresh)
    }

    /// See [`SessionCtx::load_world_from_buffer`].
    pub fn load_world_from_buffer(
        &mut self,
        bytes: &[u8],
        source_name: &str,
    ) -> Result<(), SerializeError> {
        self.ctx().load_world_from_buffer(bytes, source_name)
    }

    /// See [`SessionCtx::set_input_text`].
    pub fn set_input_text(&mut self, text: &str) {
        self.ctx().set_input_text(text);
    }

    /// See [`SessionCtx::set_window_visible`].
    pub fn set_window_visible(&mut self, kind: WindowKind, visible: bool) {
        self.ctx().set_window_visible(kind, visible);
    }

    /// See [`SessionCtx::set_debug`].
    pub fn set_debug(&mut self, enabled: bool) {
        self.ctx().set_debug(enabled);
    }

    /// See [`SessionCtx::register_callback`].
    pub fn register_callback(&mut self, callback: Callback) {
        self.callbacks.register(callback);
    }

    /// See [`SessionCtx::is_callback_registered`].
    #[must_use]
    pub fn is_callback_registered(&self, kind: CallbackKind) -> bool {
        self.callbacks.is_registered(kind)
    }

    /// Tears the session down: drops the loaded world and its recorded
    /// source, then the callback table and the engine. Use after teardown is
    /// unrepresentable; build a new session to resume.
    pub fn terminate(mut self) {
        self.engine.clear_world();
        info!("session terminated");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("callbacks", &self.callbacks)
            .field("engine_version", &self.engine.version())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedEngine;

    const WORLD: &str = "\
= START
print You are in the hall.
act Look around|print Dust everywhere.
act Leave|goto EXIT

= EXIT
print You step outside.

= PICKED
CHOSEN = ARGS

= ECHO
HEARD = USER_TEXT
";

    fn fresh() -> Session {
        Session::new(
            Box::new(ScriptedEngine::new()),
            CallbackTable::new(),
            &SessionConfig::default(),
        )
    }

    fn started() -> Session {
        let mut session = fresh();
        session
            .load_world_from_buffer(WORLD.as_bytes(), "demo.ql")
            .unwrap();
        session.restart(false).unwrap();
        session
    }

    // --- lifecycle ---

    #[test]
    fn fresh_session_has_clean_state() {
        let session = fresh();
        let snap = session.snapshot();
        assert_eq!(snap.last_error().code, 0);
        assert_eq!(snap.current_location(), None);
        assert!(snap.actions().is_empty());
        assert!(snap.window_visible(WindowKind::Actions));
    }

    #[test]
    fn load_world_records_source_without_starting() {
        let mut session = fresh();
        session
            .load_world_from_buffer(WORLD.as_bytes(), "demo.ql")
            .unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.world_source().as_deref(), Some("demo.ql"));
        assert_eq!(snap.current_location(), None, "restart enters the start location, not load");
    }

    #[test]
    fn restart_enters_the_start_location() {
        let session = started();
        let snap = session.snapshot();
        assert_eq!(snap.current_location().as_deref(), Some("START"));
        assert_eq!(snap.actions().len(), 2);
        assert!(snap.main_description().contains("hall"));
    }

    #[test]
    fn terminate_consumes_the_session() {
        started().terminate();
    }

    // --- guarded execution ---

    #[test]
    fn exec_string_assigns_a_variable() {
        let mut session = started();
        session.exec_string("X = 1 + 1", false).unwrap();
        assert_eq!(
            session.snapshot().variable_value("X", 0).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn fault_latches_and_blocks_further_calls() {
        let mut session = started();
        assert_eq!(
            session.exec_string("Y = 1 / 0", false),
            Err(GuardedError::RuntimeFault { code: 100 })
        );
        assert_eq!(session.snapshot().last_error().code, 100);
        assert_eq!(
            session.exec_string("X = 1", false),
            Err(GuardedError::PriorErrorLatched)
        );
        // the report stays visible through the rejection
        assert_eq!(session.snapshot().last_error().code, 100);
    }

    #[test]
    fn successful_pass_clears_the_latch_when_not_exiting_on_error() {
        let mut engine = ScriptedEngine::new();
        engine.load_world_direct(WORLD);
        let config = SessionConfig {
            exit_on_error: false,
            ..SessionConfig::default()
        };
        let mut session = Session::new(Box::new(engine), CallbackTable::new(), &config);
        session.restart(false).unwrap();
        assert!(session.exec_string("Y = 1 / 0", false).is_err());
        assert_eq!(session.snapshot().last_error().code, 100);
        session.exec_string("X = 1", false).unwrap();
        assert_eq!(session.snapshot().last_error().code, 0);
    }

    #[test]
    fn disabled_execution_rejects_guarded_calls() {
        let mut session = started();
        session.exec_string("halt", false).unwrap();
        assert_eq!(
            session.exec_string("X = 1", false),
            Err(GuardedError::ExecutionDisabled)
        );
        // reads stay valid while execution is disabled
        assert_eq!(session.snapshot().current_location().as_deref(), Some("START"));
    }

    // --- selections ---

    #[test]
    fn selecting_an_action_runs_the_selection_hook() {
        let mut session = started();
        session
            .exec_string("ONACTSEL = 'PICKED'", false)
            .unwrap();
        session.set_selected_action(1, false).unwrap();
        assert_eq!(session.snapshot().selected_action_index(), Some(1));
        // the hook ran with no arguments
        assert_eq!(
            session.snapshot().variable_value("CHOSEN", 0).unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn reselecting_the_current_action_is_a_no_op() {
        let mut session = started();
        session.set_selected_action(0, false).unwrap();
        session.exec_string("ONACTSEL = 'MISSING_LOC'", false).unwrap();
        // no hook run happens, so the missing hook target never faults
        session.set_selected_action(0, false).unwrap();
    }

    #[test]
    fn selecting_out_of_range_fails_without_running_the_hook() {
        let mut session = started();
        session.exec_string("ONACTSEL = 'PICKED'", false).unwrap();
        assert_eq!(
            session.set_selected_action(7, false),
            Err(SelectError::OutOfRange { index: 7, count: 2 })
        );
        assert_eq!(session.snapshot().selected_action_index(), None);
        assert!(session.snapshot().variable_value("CHOSEN", 0).is_err());
    }

    #[test]
    fn executing_without_a_selection_is_a_no_op() {
        let mut session = started();
        session.execute_selected_action(false).unwrap();
    }

    #[test]
    fn executing_the_selected_action_runs_its_code() {
        let mut session = started();
        session.set_selected_action(0, false).unwrap();
        session.execute_selected_action(false).unwrap();
        assert!(session.snapshot().main_description().contains("Dust"));
    }

    // --- menu ---

    #[test]
    fn menu_selection_passes_the_one_based_ordinal() {
        let mut session = started();
        session
            .exec_string("menu First:PICKED;Second:PICKED", false)
            .unwrap();
        assert_eq!(session.snapshot().menu_items().len(), 2);
        session.select_menu_item(1).unwrap();
        assert_eq!(
            session.snapshot().variable_value("CHOSEN", 0).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn menu_selection_out_of_range_is_ignored() {
        let mut session = started();
        session.exec_string("menu First:PICKED", false).unwrap();
        session.select_menu_item(9).unwrap();
        assert!(session.snapshot().variable_value("CHOSEN", 0).is_err());
    }

    // --- input line ---

    #[test]
    fn input_text_reaches_the_input_hook() {
        let mut session = started();
        session.exec_string("USERCOM = 'ECHO'", false).unwrap();
        session.set_input_text("open the door");
        session.exec_user_input(false).unwrap();
        assert_eq!(
            session.snapshot().variable_value("HEARD", 0).unwrap(),
            Value::Text("open the door".to_owned())
        );
    }

    // --- persistence plumbing ---

    #[test]
    fn save_requires_a_loaded_world() {
        let mut session = fresh();
        assert_eq!(session.save_to_buffer(), Err(SerializeError::EmptyState));
    }

    #[test]
    fn save_then_load_round_trips_the_state() {
        let mut session = started();
        session.exec_string("X = 41 + 1", false).unwrap();
        let saved = session.save_to_buffer().unwrap();
        session.exec_string("X = 0", false).unwrap();
        session.exec_string("goto EXIT", false).unwrap();
        assert_eq!(session.snapshot().current_location().as_deref(), Some("EXIT"));
        session.load_from_buffer(&saved, false).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.current_location().as_deref(), Some("START"));
        assert_eq!(snap.variable_value("X", 0).unwrap(), Value::Int(42));
    }

    // --- counter reentrancy ---

    #[test]
    fn counter_is_a_no_op_inside_a_callback() {
        let mut table = CallbackTable::new();
        table.register(Callback::ShowMessage(Box::new(|ctx, _text| {
            // the tick must not run while the engine is suspended in here
            ctx.exec_counter(false).unwrap();
            assert!(ctx.snapshot().variable_value("TICKED", 0).is_err());
        })));
        let mut engine = ScriptedEngine::new();
        engine.load_world_direct(
            "= START\nCOUNTER = 'TICK'\nmsg hello\n\n= TICK\nTICKED = 1\n",
        );
        let mut session = Session::new(Box::new(engine), table, &SessionConfig::default());
        session.restart(false).unwrap();
        // outside any callback the tick runs normally
        session.exec_counter(false).unwrap();
        assert_eq!(
            session.snapshot().variable_value("TICKED", 0).unwrap(),
            Value::Int(1)
        );
    }

    // --- refresh notification ---

    #[test]
    fn refresh_flag_fires_the_refresh_callback_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        let mut table = CallbackTable::new();
        table.register(Callback::RefreshInt(Box::new(move |_ctx| {
            seen.set(seen.get() + 1);
        })));
        let mut engine = ScriptedEngine::new();
        engine.load_world_direct(WORLD);
        let mut session = Session::new(Box::new(engine), table, &SessionConfig::default());
        session.restart(false).unwrap();
        session.exec_string("X = 1", true).unwrap();
        assert_eq!(hits.get(), 1);
        session.exec_string("X = 2", false).unwrap();
        assert_eq!(hits.get(), 1, "no refresh when the flag is off");
        assert!(session.exec_string("Y = 1 / 0", true).is_err());
        assert_eq!(hits.get(), 1, "no refresh after a fault");
    }
}
