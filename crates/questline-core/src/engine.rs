//! The interpreter seam.
//!
//! The bridge never looks inside the interpreter: it drives an [`Engine`]
//! trait object through a small set of execution primitives and direct state
//! reads. During a run the engine gets an
//! [`EngineCtx`](crate::session::EngineCtx) through which it reports faults,
//! requests an execution halt, and invokes host callbacks; everything else is
//! synchronous storage access.
//!
//! [`ScriptedEngine`](crate::scripted::ScriptedEngine) is the built-in
//! implementation used by the CLI host and the test-suite.

use serde::{Deserialize, Serialize};

use crate::error::VariableError;
use crate::session::EngineCtx;
use crate::snapshot::ListEntry;

/// Reserved entry-location hooks the bridge runs by name.
///
/// Each resolves through the engine: the variable of the same name holds the
/// target location's name. An unbound hook is a successful no-op.
pub mod hooks {
    /// Per-tick handler, driven by the host's timer.
    pub const COUNTER: &str = "COUNTER";
    /// Input-line handler.
    pub const USER_INPUT: &str = "USERCOM";
    /// Runs after the selected action changes.
    pub const ON_ACTION_SELECTED: &str = "ONACTSEL";
    /// Runs after the selected object changes.
    pub const ON_OBJECT_SELECTED: &str = "ONOBJSEL";
}

/// A script value: integer or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Numeric value.
    Int(i32),
    /// Text value.
    Text(String),
}

impl Value {
    /// Numeric payload, if this is an [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Text payload, if this is a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Int(_) => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Host window panes whose visibility the engine controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKind {
    /// Action list pane.
    Actions,
    /// Inventory-object pane.
    Objects,
    /// Supplementary description pane.
    Variables,
    /// Input line.
    Input,
}

impl WindowKind {
    /// All panes, in their historical order.
    pub const ALL: [WindowKind; 4] = [
        WindowKind::Actions,
        WindowKind::Objects,
        WindowKind::Variables,
        WindowKind::Input,
    ];

    /// Stable index used for flag storage.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            WindowKind::Actions => 0,
            WindowKind::Objects => 1,
            WindowKind::Variables => 2,
            WindowKind::Input => 3,
        }
    }

    /// Short lowercase name for logs and state dumps.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WindowKind::Actions => "actions",
            WindowKind::Objects => "objects",
            WindowKind::Variables => "variables",
            WindowKind::Input => "input",
        }
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending menu row: what the host shows, and where selection goes.
///
/// Selecting row `i` runs `target` with a single numeric argument `i + 1`
/// (1-based, a convention preserved from the historical interface).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Visible label.
    pub label: String,
    /// Optional image path.
    pub image: Option<String>,
    /// Location name executed when the row is selected.
    pub target: String,
}

/// The opaque interpreter the bridge drives.
///
/// Execution primitives receive an [`EngineCtx`] for fault reporting and
/// host-callback invocation; they return normally even on faults (the bridge
/// reads the latched report afterwards, guard step 5). Storage reads are
/// plain synchronous accessors over engine-owned state.
pub trait Engine {
    // -- identity --

    /// Engine self-reported version string.
    fn version(&self) -> &str;

    // -- lifecycle --

    /// Resets to session defaults: storage cleared, selections unset, window
    /// panes visible, counters zeroed, deterministic RNG reseeded.
    fn reset(&mut self);

    /// Drops the loaded world and any recorded source path.
    fn clear_world(&mut self);

    /// Marks the start of a guarded run: clears the per-run changed flags.
    fn begin_run(&mut self);

    // -- world management --

    /// Decodes a game definition from `padded` (over-allocated and
    /// zero-terminated by the bridge, see
    /// [`crate::serialize::WORLD_PADDING_BYTES`]) and records `source_name`.
    fn load_world(&mut self, ctx: &mut EngineCtx<'_>, padded: &[u8], source_name: &str);

    /// Restores the loaded world's initial state and runs its entry point.
    fn restart(&mut self, ctx: &mut EngineCtx<'_>);

    // -- execution primitives --

    /// Runs a code fragment.
    fn run_code(&mut self, ctx: &mut EngineCtx<'_>, code: &str);

    /// Runs a named location with the given arguments.
    fn run_location(&mut self, ctx: &mut EngineCtx<'_>, name: &str, args: &[Value]);

    /// Runs a reserved [`hooks`] entry; unbound hooks are a no-op.
    fn run_hook(&mut self, ctx: &mut EngineCtx<'_>, hook: &str);

    /// Runs the code of action `index`.
    fn run_action(&mut self, ctx: &mut EngineCtx<'_>, index: usize);

    // -- status codec --

    /// Width in bytes of the engine's native text unit inside encoded
    /// status buffers; the bridge sizes working copies in whole units.
    fn status_unit_width(&self) -> usize;

    /// Encodes the full dynamic state; empty means nothing to save.
    fn save_status(&mut self, ctx: &mut EngineCtx<'_>) -> Vec<u8>;

    /// Decodes a status buffer previously produced by [`Engine::save_status`].
    /// `padded` ends with a zeroed terminator unit appended by the bridge.
    fn load_status(&mut self, ctx: &mut EngineCtx<'_>, padded: &[u8]);

    // -- storage reads --

    /// Player's current location name, once one has been entered.
    fn current_location(&self) -> Option<&str>;

    /// Location currently executing, for diagnostics.
    fn execution_location(&self) -> Option<&str>;

    /// Action index currently executing, if the run came from one.
    fn execution_action_index(&self) -> Option<usize>;

    /// Line number within the executing block (0 outside a run).
    fn execution_line(&self) -> usize;

    /// Main description text.
    fn main_description(&self) -> &str;

    /// Whether the main description changed during the last run.
    fn main_description_changed(&self) -> bool;

    /// Supplementary description text.
    fn extra_description(&self) -> &str;

    /// Whether the supplementary description changed during the last run.
    fn extra_description_changed(&self) -> bool;

    /// Current action list, interpreter order.
    fn actions(&self) -> &[ListEntry];

    /// Whether the action list changed during the last run.
    fn actions_changed(&self) -> bool;

    /// Current object list, interpreter order.
    fn objects(&self) -> &[ListEntry];

    /// Whether the object list changed during the last run.
    fn objects_changed(&self) -> bool;

    /// Selected action index, if any.
    fn selected_action(&self) -> Option<usize>;

    /// Records the selected action index.
    fn set_selected_action(&mut self, index: Option<usize>);

    /// Selected object index, if any.
    fn selected_object(&self) -> Option<usize>;

    /// Records the selected object index.
    fn set_selected_object(&mut self, index: Option<usize>);

    /// Pending menu rows accumulated by the last menu statement.
    fn menu_items(&self) -> &[MenuItem];

    /// Reads one element of a variable; pure.
    fn variable(&self, name: &str, index: usize) -> Result<Value, VariableError>;

    /// Number of values a variable holds; pure.
    fn variable_count(&self, name: &str) -> Result<usize, VariableError>;

    /// Stores the pending input-line text for the input hook to consume.
    fn set_input_text(&mut self, text: &str);

    /// Whether a window pane is visible.
    fn window_visible(&self, kind: WindowKind) -> bool;

    /// Sets a window pane's visibility.
    fn set_window_visible(&mut self, kind: WindowKind, visible: bool);

    /// Monotonic count of full view refreshes.
    fn full_refresh_count(&self) -> u32;

    /// Source name recorded by the last world load.
    fn world_source(&self) -> Option<&str>;

    /// Enables or disables debug mode.
    fn set_debug(&mut self, enabled: bool);

    /// Whether debug mode is enabled.
    fn debug(&self) -> bool;
}
