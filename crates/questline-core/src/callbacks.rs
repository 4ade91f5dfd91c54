//! Host callback registry and dispatch.
//!
//! The engine reaches the host exclusively through eighteen typed callback
//! slots. Registration replaces the slot in O(1); invocation goes through a
//! `call_*` method per kind on [`EngineCtx`](crate::session::EngineCtx) so
//! every signature stays visible at the call site, with a private macro
//! sharing the take/restore plumbing. An unregistered slot degrades to a
//! neutral default (`false`, `0`, an empty string or buffer, or a plain
//! no-op) instead of an error.
//!
//! Re-entry is the interesting part: a handler receives a
//! [`SessionCtx`](crate::session::SessionCtx) and may run bridge operations,
//! which can re-enter the engine and fire further callbacks. To make that
//! sound without aliasing the registry, dispatch takes the handler out of its
//! slot for the duration of the call and puts it back afterwards. Two
//! consequences, both intended:
//!
//! * a handler that (transitively) triggers its own kind again sees the empty
//!   slot and gets the neutral default rather than unbounded recursion;
//! * a handler that registers a replacement for its own kind wins, because
//!   the taken-out original is only restored into a still-empty slot.
//!
//! [`SessionState::callback_depth`](crate::session::SessionState) is raised
//! around every handler call so guarded operations can detect that they are
//! running inside a callback.

use tracing::{debug, trace};

use crate::engine::{Engine, WindowKind};
use crate::session::{EngineCtx, SessionCtx};

/// Boxed handler for [`CallbackKind::Debug`].
pub type DebugFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str)>;
/// Boxed handler for [`CallbackKind::RefreshInt`].
pub type RefreshIntFn = Box<dyn FnMut(&mut SessionCtx<'_>)>;
/// Boxed handler for [`CallbackKind::ShowImage`].
pub type ShowImageFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str)>;
/// Boxed handler for [`CallbackKind::ShowMessage`].
pub type ShowMessageFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str)>;
/// Boxed handler for [`CallbackKind::ShowWindow`].
pub type ShowWindowFn = Box<dyn FnMut(&mut SessionCtx<'_>, WindowKind, bool)>;
/// Boxed handler for [`CallbackKind::ShowMenu`].
pub type ShowMenuFn = Box<dyn FnMut(&mut SessionCtx<'_>)>;
/// Boxed handler for [`CallbackKind::AddMenuItem`].
pub type AddMenuItemFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str, Option<&str>)>;
/// Boxed handler for [`CallbackKind::PlayFile`].
pub type PlayFileFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str, i32)>;
/// Boxed handler for [`CallbackKind::IsPlayingFile`].
pub type IsPlayingFileFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str) -> bool>;
/// Boxed handler for [`CallbackKind::CloseFile`].
pub type CloseFileFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str)>;
/// Boxed handler for [`CallbackKind::OpenGameStatus`].
pub type OpenGameStatusFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str)>;
/// Boxed handler for [`CallbackKind::SaveGameStatus`].
pub type SaveGameStatusFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str)>;
/// Boxed handler for [`CallbackKind::InputBox`].
pub type InputBoxFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str) -> String>;
/// Boxed handler for [`CallbackKind::SetTimer`].
pub type SetTimerFn = Box<dyn FnMut(&mut SessionCtx<'_>, u32)>;
/// Boxed handler for [`CallbackKind::GetMsCount`].
pub type GetMsCountFn = Box<dyn FnMut(&mut SessionCtx<'_>) -> u32>;
/// Boxed handler for [`CallbackKind::Sleep`].
pub type SleepFn = Box<dyn FnMut(&mut SessionCtx<'_>, u32)>;
/// Boxed handler for [`CallbackKind::GetFileContent`].
pub type GetFileContentFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str) -> Vec<u8>>;
/// Boxed handler for [`CallbackKind::ChangeQuestPath`].
pub type ChangeQuestPathFn = Box<dyn FnMut(&mut SessionCtx<'_>, &str)>;

/// The eighteen callback kinds the engine can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Debug-trace line from the engine.
    Debug,
    /// Incremental view refresh after a run that changed something.
    RefreshInt,
    /// Show an image file.
    ShowImage,
    /// Show a modal message.
    ShowMessage,
    /// Show or hide a window pane.
    ShowWindow,
    /// Present the accumulated menu rows and let the player pick one.
    ShowMenu,
    /// Offer one menu row to the host before the menu is shown.
    AddMenuItem,
    /// Start playback of a media file at a volume.
    PlayFile,
    /// Ask whether a media file is still playing.
    IsPlayingFile,
    /// Stop playback of one file, or of everything when the name is empty.
    CloseFile,
    /// Script-requested load of a named saved game.
    OpenGameStatus,
    /// Script-requested save to a named slot.
    SaveGameStatus,
    /// Prompt the player for a line of text.
    InputBox,
    /// Arm or disarm the host's tick timer.
    SetTimer,
    /// Millisecond counter read.
    GetMsCount,
    /// Pause for a number of milliseconds.
    Sleep,
    /// Read a file's raw bytes through the host.
    GetFileContent,
    /// Change the base path used to resolve game resources.
    ChangeQuestPath,
}

impl CallbackKind {
    /// Every kind, in declaration order.
    pub const ALL: [CallbackKind; 18] = [
        CallbackKind::Debug,
        CallbackKind::RefreshInt,
        CallbackKind::ShowImage,
        CallbackKind::ShowMessage,
        CallbackKind::ShowWindow,
        CallbackKind::ShowMenu,
        CallbackKind::AddMenuItem,
        CallbackKind::PlayFile,
        CallbackKind::IsPlayingFile,
        CallbackKind::CloseFile,
        CallbackKind::OpenGameStatus,
        CallbackKind::SaveGameStatus,
        CallbackKind::InputBox,
        CallbackKind::SetTimer,
        CallbackKind::GetMsCount,
        CallbackKind::Sleep,
        CallbackKind::GetFileContent,
        CallbackKind::ChangeQuestPath,
    ];

    /// Stable snake_case name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackKind::Debug => "debug",
            CallbackKind::RefreshInt => "refresh_int",
            CallbackKind::ShowImage => "show_image",
            CallbackKind::ShowMessage => "show_message",
            CallbackKind::ShowWindow => "show_window",
            CallbackKind::ShowMenu => "show_menu",
            CallbackKind::AddMenuItem => "add_menu_item",
            CallbackKind::PlayFile => "play_file",
            CallbackKind::IsPlayingFile => "is_playing_file",
            CallbackKind::CloseFile => "close_file",
            CallbackKind::OpenGameStatus => "open_game_status",
            CallbackKind::SaveGameStatus => "save_game_status",
            CallbackKind::InputBox => "input_box",
            CallbackKind::SetTimer => "set_timer",
            CallbackKind::GetMsCount => "get_ms_count",
            CallbackKind::Sleep => "sleep",
            CallbackKind::GetFileContent => "get_file_content",
            CallbackKind::ChangeQuestPath => "change_quest_path",
        }
    }
}

impl std::fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler paired with the slot it registers into.
pub enum Callback {
    /// Handler for [`CallbackKind::Debug`].
    Debug(DebugFn),
    /// Handler for [`CallbackKind::RefreshInt`].
    RefreshInt(RefreshIntFn),
    /// Handler for [`CallbackKind::ShowImage`].
    ShowImage(ShowImageFn),
    /// Handler for [`CallbackKind::ShowMessage`].
    ShowMessage(ShowMessageFn),
    /// Handler for [`CallbackKind::ShowWindow`].
    ShowWindow(ShowWindowFn),
    /// Handler for [`CallbackKind::ShowMenu`].
    ShowMenu(ShowMenuFn),
    /// Handler for [`CallbackKind::AddMenuItem`].
    AddMenuItem(AddMenuItemFn),
    /// Handler for [`CallbackKind::PlayFile`].
    PlayFile(PlayFileFn),
    /// Handler for [`CallbackKind::IsPlayingFile`].
    IsPlayingFile(IsPlayingFileFn),
    /// Handler for [`CallbackKind::CloseFile`].
    CloseFile(CloseFileFn),
    /// Handler for [`CallbackKind::OpenGameStatus`].
    OpenGameStatus(OpenGameStatusFn),
    /// Handler for [`CallbackKind::SaveGameStatus`].
    SaveGameStatus(SaveGameStatusFn),
    /// Handler for [`CallbackKind::InputBox`].
    InputBox(InputBoxFn),
    /// Handler for [`CallbackKind::SetTimer`].
    SetTimer(SetTimerFn),
    /// Handler for [`CallbackKind::GetMsCount`].
    GetMsCount(GetMsCountFn),
    /// Handler for [`CallbackKind::Sleep`].
    Sleep(SleepFn),
    /// Handler for [`CallbackKind::GetFileContent`].
    GetFileContent(GetFileContentFn),
    /// Handler for [`CallbackKind::ChangeQuestPath`].
    ChangeQuestPath(ChangeQuestPathFn),
}

impl Callback {
    /// The slot this handler registers into.
    #[must_use]
    pub fn kind(&self) -> CallbackKind {
        match self {
            Callback::Debug(_) => CallbackKind::Debug,
            Callback::RefreshInt(_) => CallbackKind::RefreshInt,
            Callback::ShowImage(_) => CallbackKind::ShowImage,
            Callback::ShowMessage(_) => CallbackKind::ShowMessage,
            Callback::ShowWindow(_) => CallbackKind::ShowWindow,
            Callback::ShowMenu(_) => CallbackKind::ShowMenu,
            Callback::AddMenuItem(_) => CallbackKind::AddMenuItem,
            Callback::PlayFile(_) => CallbackKind::PlayFile,
            Callback::IsPlayingFile(_) => CallbackKind::IsPlayingFile,
            Callback::CloseFile(_) => CallbackKind::CloseFile,
            Callback::OpenGameStatus(_) => CallbackKind::OpenGameStatus,
            Callback::SaveGameStatus(_) => CallbackKind::SaveGameStatus,
            Callback::InputBox(_) => CallbackKind::InputBox,
            Callback::SetTimer(_) => CallbackKind::SetTimer,
            Callback::GetMsCount(_) => CallbackKind::GetMsCount,
            Callback::Sleep(_) => CallbackKind::Sleep,
            Callback::GetFileContent(_) => CallbackKind::GetFileContent,
            Callback::ChangeQuestPath(_) => CallbackKind::ChangeQuestPath,
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Callback").field(&self.kind()).finish()
    }
}

/// One typed slot per callback kind.
#[derive(Default)]
pub struct CallbackTable {
    pub(crate) debug: Option<DebugFn>,
    pub(crate) refresh_int: Option<RefreshIntFn>,
    pub(crate) show_image: Option<ShowImageFn>,
    pub(crate) show_message: Option<ShowMessageFn>,
    pub(crate) show_window: Option<ShowWindowFn>,
    pub(crate) show_menu: Option<ShowMenuFn>,
    pub(crate) add_menu_item: Option<AddMenuItemFn>,
    pub(crate) play_file: Option<PlayFileFn>,
    pub(crate) is_playing_file: Option<IsPlayingFileFn>,
    pub(crate) close_file: Option<CloseFileFn>,
    pub(crate) open_game_status: Option<OpenGameStatusFn>,
    pub(crate) save_game_status: Option<SaveGameStatusFn>,
    pub(crate) input_box: Option<InputBoxFn>,
    pub(crate) set_timer: Option<SetTimerFn>,
    pub(crate) get_ms_count: Option<GetMsCountFn>,
    pub(crate) sleep: Option<SleepFn>,
    pub(crate) get_file_content: Option<GetFileContentFn>,
    pub(crate) change_quest_path: Option<ChangeQuestPathFn>,
}

impl CallbackTable {
    /// Empty table; every invocation degrades to its neutral default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `callback` into its slot, replacing any previous handler.
    pub fn register(&mut self, callback: Callback) {
        let kind = callback.kind();
        debug!(%kind, "registering callback");
        match callback {
            Callback::Debug(f) => self.debug = Some(f),
            Callback::RefreshInt(f) => self.refresh_int = Some(f),
            Callback::ShowImage(f) => self.show_image = Some(f),
            Callback::ShowMessage(f) => self.show_message = Some(f),
            Callback::ShowWindow(f) => self.show_window = Some(f),
            Callback::ShowMenu(f) => self.show_menu = Some(f),
            Callback::AddMenuItem(f) => self.add_menu_item = Some(f),
            Callback::PlayFile(f) => self.play_file = Some(f),
            Callback::IsPlayingFile(f) => self.is_playing_file = Some(f),
            Callback::CloseFile(f) => self.close_file = Some(f),
            Callback::OpenGameStatus(f) => self.open_game_status = Some(f),
            Callback::SaveGameStatus(f) => self.save_game_status = Some(f),
            Callback::InputBox(f) => self.input_box = Some(f),
            Callback::SetTimer(f) => self.set_timer = Some(f),
            Callback::GetMsCount(f) => self.get_ms_count = Some(f),
            Callback::Sleep(f) => self.sleep = Some(f),
            Callback::GetFileContent(f) => self.get_file_content = Some(f),
            Callback::ChangeQuestPath(f) => self.change_quest_path = Some(f),
        }
    }

    /// Empties a slot; returns whether a handler was present.
    pub fn unregister(&mut self, kind: CallbackKind) -> bool {
        debug!(%kind, "unregistering callback");
        match kind {
            CallbackKind::Debug => self.debug.take().is_some(),
            CallbackKind::RefreshInt => self.refresh_int.take().is_some(),
            CallbackKind::ShowImage => self.show_image.take().is_some(),
            CallbackKind::ShowMessage => self.show_message.take().is_some(),
            CallbackKind::ShowWindow => self.show_window.take().is_some(),
            CallbackKind::ShowMenu => self.show_menu.take().is_some(),
            CallbackKind::AddMenuItem => self.add_menu_item.take().is_some(),
            CallbackKind::PlayFile => self.play_file.take().is_some(),
            CallbackKind::IsPlayingFile => self.is_playing_file.take().is_some(),
            CallbackKind::CloseFile => self.close_file.take().is_some(),
            CallbackKind::OpenGameStatus => self.open_game_status.take().is_some(),
            CallbackKind::SaveGameStatus => self.save_game_status.take().is_some(),
            CallbackKind::InputBox => self.input_box.take().is_some(),
            CallbackKind::SetTimer => self.set_timer.take().is_some(),
            CallbackKind::GetMsCount => self.get_ms_count.take().is_some(),
            CallbackKind::Sleep => self.sleep.take().is_some(),
            CallbackKind::GetFileContent => self.get_file_content.take().is_some(),
            CallbackKind::ChangeQuestPath => self.change_quest_path.take().is_some(),
        }
    }

    /// Whether a handler is installed for `kind`.
    #[must_use]
    pub fn is_registered(&self, kind: CallbackKind) -> bool {
        match kind {
            CallbackKind::Debug => self.debug.is_some(),
            CallbackKind::RefreshInt => self.refresh_int.is_some(),
            CallbackKind::ShowImage => self.show_image.is_some(),
            CallbackKind::ShowMessage => self.show_message.is_some(),
            CallbackKind::ShowWindow => self.show_window.is_some(),
            CallbackKind::ShowMenu => self.show_menu.is_some(),
            CallbackKind::AddMenuItem => self.add_menu_item.is_some(),
            CallbackKind::PlayFile => self.play_file.is_some(),
            CallbackKind::IsPlayingFile => self.is_playing_file.is_some(),
            CallbackKind::CloseFile => self.close_file.is_some(),
            CallbackKind::OpenGameStatus => self.open_game_status.is_some(),
            CallbackKind::SaveGameStatus => self.save_game_status.is_some(),
            CallbackKind::InputBox => self.input_box.is_some(),
            CallbackKind::SetTimer => self.set_timer.is_some(),
            CallbackKind::GetMsCount => self.get_ms_count.is_some(),
            CallbackKind::Sleep => self.sleep.is_some(),
            CallbackKind::GetFileContent => self.get_file_content.is_some(),
            CallbackKind::ChangeQuestPath => self.change_quest_path.is_some(),
        }
    }

    /// Number of installed handlers.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        CallbackKind::ALL
            .iter()
            .filter(|&&kind| self.is_registered(kind))
            .count()
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<CallbackKind> = CallbackKind::ALL
            .iter()
            .copied()
            .filter(|&kind| self.is_registered(kind))
            .collect();
        f.debug_struct("CallbackTable")
            .field("registered", &registered)
            .finish()
    }
}

/// Dispatch helper: takes the handler out of its slot, runs it against a
/// fresh [`SessionCtx`] with the depth counter raised, then restores it
/// unless the handler installed a replacement for its own kind.
macro_rules! dispatch {
    ($self:ident, $engine:ident, $slot:ident, $kind:expr, |$ctx:ident, $cb:ident| $body:expr, $default:expr) => {{
        let Some(mut $cb) = $self.callbacks.$slot.take() else {
            trace!(kind = %$kind, "callback not registered, using neutral default");
            return $default;
        };
        $self.state.callback_depth += 1;
        let out = {
            let mut $ctx = SessionCtx {
                state: &mut *$self.state,
                callbacks: &mut *$self.callbacks,
                engine: $engine,
            };
            $body
        };
        $self.state.callback_depth -= 1;
        if $self.callbacks.$slot.is_none() {
            $self.callbacks.$slot = Some($cb);
        }
        out
    }};
}

impl EngineCtx<'_> {
    /// Forwards a debug-trace line to the host.
    pub fn call_debug(&mut self, engine: &mut dyn Engine, text: &str) {
        dispatch!(self, engine, debug, CallbackKind::Debug, |ctx, cb| cb(&mut ctx, text), ())
    }

    /// Asks the host for an incremental view refresh.
    pub fn call_refresh_int(&mut self, engine: &mut dyn Engine) {
        dispatch!(self, engine, refresh_int, CallbackKind::RefreshInt, |ctx, cb| cb(&mut ctx), ())
    }

    /// Asks the host to show an image file.
    pub fn call_show_image(&mut self, engine: &mut dyn Engine, file: &str) {
        dispatch!(self, engine, show_image, CallbackKind::ShowImage, |ctx, cb| cb(&mut ctx, file), ())
    }

    /// Asks the host to show a modal message.
    pub fn call_show_message(&mut self, engine: &mut dyn Engine, text: &str) {
        dispatch!(
            self,
            engine,
            show_message,
            CallbackKind::ShowMessage,
            |ctx, cb| cb(&mut ctx, text),
            ()
        )
    }

    /// Tells the host a window pane's visibility changed.
    pub fn call_show_window(&mut self, engine: &mut dyn Engine, kind: WindowKind, visible: bool) {
        dispatch!(
            self,
            engine,
            show_window,
            CallbackKind::ShowWindow,
            |ctx, cb| cb(&mut ctx, kind, visible),
            ()
        )
    }

    /// Asks the host to present the accumulated menu rows.
    pub fn call_show_menu(&mut self, engine: &mut dyn Engine) {
        dispatch!(self, engine, show_menu, CallbackKind::ShowMenu, |ctx, cb| cb(&mut ctx), ())
    }

    /// Offers one menu row to the host ahead of [`Self::call_show_menu`].
    pub fn call_add_menu_item(&mut self, engine: &mut dyn Engine, label: &str, image: Option<&str>) {
        dispatch!(
            self,
            engine,
            add_menu_item,
            CallbackKind::AddMenuItem,
            |ctx, cb| cb(&mut ctx, label, image),
            ()
        )
    }

    /// Asks the host to start media playback.
    pub fn call_play_file(&mut self, engine: &mut dyn Engine, file: &str, volume: i32) {
        dispatch!(
            self,
            engine,
            play_file,
            CallbackKind::PlayFile,
            |ctx, cb| cb(&mut ctx, file, volume),
            ()
        )
    }

    /// Asks the host whether a media file is still playing; `false` when no
    /// handler is installed.
    pub fn call_is_playing_file(&mut self, engine: &mut dyn Engine, file: &str) -> bool {
        dispatch!(
            self,
            engine,
            is_playing_file,
            CallbackKind::IsPlayingFile,
            |ctx, cb| cb(&mut ctx, file),
            false
        )
    }

    /// Asks the host to stop playback of `file`, or of everything when the
    /// name is empty.
    pub fn call_close_file(&mut self, engine: &mut dyn Engine, file: &str) {
        dispatch!(self, engine, close_file, CallbackKind::CloseFile, |ctx, cb| cb(&mut ctx, file), ())
    }

    /// Relays a script-initiated load of a named saved game to the host.
    pub fn call_open_game_status(&mut self, engine: &mut dyn Engine, name: &str) {
        dispatch!(
            self,
            engine,
            open_game_status,
            CallbackKind::OpenGameStatus,
            |ctx, cb| cb(&mut ctx, name),
            ()
        )
    }

    /// Relays a script-initiated save to a named slot to the host.
    pub fn call_save_game_status(&mut self, engine: &mut dyn Engine, name: &str) {
        dispatch!(
            self,
            engine,
            save_game_status,
            CallbackKind::SaveGameStatus,
            |ctx, cb| cb(&mut ctx, name),
            ()
        )
    }

    /// Prompts the player for a line of text; empty when no handler is
    /// installed.
    pub fn call_input_box(&mut self, engine: &mut dyn Engine, prompt: &str) -> String {
        dispatch!(
            self,
            engine,
            input_box,
            CallbackKind::InputBox,
            |ctx, cb| cb(&mut ctx, prompt),
            String::new()
        )
    }

    /// Asks the host to arm its tick timer (`0` disarms).
    pub fn call_set_timer(&mut self, engine: &mut dyn Engine, interval_ms: u32) {
        dispatch!(
            self,
            engine,
            set_timer,
            CallbackKind::SetTimer,
            |ctx, cb| cb(&mut ctx, interval_ms),
            ()
        )
    }

    /// Reads the host's millisecond counter; `0` when no handler is
    /// installed.
    pub fn call_get_ms_count(&mut self, engine: &mut dyn Engine) -> u32 {
        dispatch!(self, engine, get_ms_count, CallbackKind::GetMsCount, |ctx, cb| cb(&mut ctx), 0)
    }

    /// Asks the host to pause for a number of milliseconds.
    pub fn call_sleep(&mut self, engine: &mut dyn Engine, duration_ms: u32) {
        dispatch!(self, engine, sleep, CallbackKind::Sleep, |ctx, cb| cb(&mut ctx, duration_ms), ())
    }

    /// Reads a file's raw bytes through the host; empty when no handler is
    /// installed.
    pub fn call_get_file_content(&mut self, engine: &mut dyn Engine, file: &str) -> Vec<u8> {
        dispatch!(
            self,
            engine,
            get_file_content,
            CallbackKind::GetFileContent,
            |ctx, cb| cb(&mut ctx, file),
            Vec::new()
        )
    }

    /// Tells the host the base resource path changed.
    pub fn call_change_quest_path(&mut self, engine: &mut dyn Engine, path: &str) {
        dispatch!(
            self,
            engine,
            change_quest_path,
            CallbackKind::ChangeQuestPath,
            |ctx, cb| cb(&mut ctx, path),
            ()
        )
    }
}
