//! Read models exported to the host, plus the live [`Snapshot`] view.
//!
//! Everything here is computed fresh from engine storage at call time.
//! Nothing is cached, so there is no invalidation to get wrong; a view is
//! valid only for the borrow that produced it.

use serde::{Deserialize, Serialize};

use crate::engine::{Engine, MenuItem, Value, WindowKind};
use crate::error::VariableError;
use crate::session::SessionState;

/// Where the interpreter currently is, for diagnostics and host rendering.
///
/// `location` is `None` when no location has executed yet (or the engine's
/// real location index is out of range); an empty name stays a real value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionState {
    /// Name of the location being executed, if any.
    pub location: Option<String>,
    /// Index of the action being executed, if the run came from one.
    pub action_index: Option<usize>,
    /// Line number within the executing code block (0 before any run).
    pub line: usize,
}

/// Latched fault report.
///
/// `code == 0` means no fault. Set by the engine when a fault occurs (first
/// report wins), cleared only by the guard at the start of the next
/// successful top-level operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Raw fault code; described by [`crate::error_codes::describe`].
    pub code: i32,
    /// Location that was executing when the fault was raised.
    pub location: Option<String>,
    /// Action index that was executing, if any.
    pub action_index: Option<usize>,
    /// Line within the faulting code block.
    pub line: usize,
}

impl ErrorReport {
    /// Whether a fault is latched.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.code != 0
    }

    pub(crate) fn clear(&mut self) {
        *self = ErrorReport::default();
    }
}

/// One row of the action or inventory-object list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Optional image path attached to the row.
    pub image: Option<String>,
    /// Visible row text.
    pub description: String,
}

/// Freshly computed read-only views of the session.
///
/// Obtained from [`crate::Session::snapshot`] or
/// [`crate::SessionCtx::snapshot`] (the latter inside host callbacks, where
/// it reads the live state of the suspended run). Pure reads: nothing here
/// runs the guard or touches the latched fault report.
pub struct Snapshot<'a> {
    pub(crate) state: &'a SessionState,
    pub(crate) engine: &'a dyn Engine,
}

impl Snapshot<'_> {
    /// Current execution position, assembled fresh from engine storage.
    #[must_use]
    pub fn execution_state(&self) -> ExecutionState {
        ExecutionState {
            location: self.engine.execution_location().map(str::to_owned),
            action_index: self.engine.execution_action_index(),
            line: self.engine.execution_line(),
        }
    }

    /// Name of the player's current location; `None` before the first
    /// location change (absent, as opposed to an empty name).
    #[must_use]
    pub fn current_location(&self) -> Option<String> {
        self.engine.current_location().map(str::to_owned)
    }

    /// Main description text.
    #[must_use]
    pub fn main_description(&self) -> String {
        self.engine.main_description().to_owned()
    }

    /// Whether the main description changed during the last run.
    #[must_use]
    pub fn main_description_changed(&self) -> bool {
        self.engine.main_description_changed()
    }

    /// Supplementary (variables pane) description text.
    #[must_use]
    pub fn extra_description(&self) -> String {
        self.engine.extra_description().to_owned()
    }

    /// Whether the supplementary description changed during the last run.
    #[must_use]
    pub fn extra_description_changed(&self) -> bool {
        self.engine.extra_description_changed()
    }

    /// Ordered copy of the current action list.
    #[must_use]
    pub fn actions(&self) -> Vec<ListEntry> {
        self.engine.actions().to_vec()
    }

    /// Whether the action list changed during the last run.
    #[must_use]
    pub fn actions_changed(&self) -> bool {
        self.engine.actions_changed()
    }

    /// Ordered copy of the current object list.
    #[must_use]
    pub fn objects(&self) -> Vec<ListEntry> {
        self.engine.objects().to_vec()
    }

    /// Whether the object list changed during the last run.
    #[must_use]
    pub fn objects_changed(&self) -> bool {
        self.engine.objects_changed()
    }

    /// Index of the selected action, if any.
    #[must_use]
    pub fn selected_action_index(&self) -> Option<usize> {
        self.engine.selected_action()
    }

    /// Index of the selected object, if any.
    #[must_use]
    pub fn selected_object_index(&self) -> Option<usize> {
        self.engine.selected_object()
    }

    /// Ordered copy of the pending menu, as accumulated by the engine.
    #[must_use]
    pub fn menu_items(&self) -> Vec<MenuItem> {
        self.engine.menu_items().to_vec()
    }

    /// Reads one element of a variable.
    ///
    /// Pure: never runs the guard, never clears a latched fault.
    pub fn variable_value(&self, name: &str, index: usize) -> Result<Value, VariableError> {
        self.engine.variable(name, index)
    }

    /// Number of values a variable holds.
    pub fn variable_values_count(&self, name: &str) -> Result<usize, VariableError> {
        self.engine.variable_count(name)
    }

    /// The latched fault report; `code == 0` when clear. Reading never
    /// clears it.
    #[must_use]
    pub fn last_error(&self) -> ErrorReport {
        self.state.last_error.clone()
    }

    /// Whether a window pane is currently visible.
    #[must_use]
    pub fn window_visible(&self, kind: WindowKind) -> bool {
        self.engine.window_visible(kind)
    }

    /// Engine self-reported version string.
    #[must_use]
    pub fn interpreter_version(&self) -> String {
        self.engine.version().to_owned()
    }

    /// Monotonic count of full view refreshes the engine has performed.
    #[must_use]
    pub fn full_refresh_count(&self) -> u32 {
        self.engine.full_refresh_count()
    }

    /// Source name recorded when the current world was loaded.
    #[must_use]
    pub fn world_source(&self) -> Option<String> {
        self.engine.world_source().map(str::to_owned)
    }

    /// Whether debug mode is enabled.
    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.engine.debug()
    }
}
