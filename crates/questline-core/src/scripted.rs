//! The built-in scripted interpreter.
//!
//! [`ScriptedEngine`] is a small, deterministic [`Engine`] implementation:
//! enough interpreter to drive every bridge path (execution, faults, host
//! callbacks, persistence) from plain-text worlds, without being a full
//! scripting language.
//!
//! # World format
//!
//! A world is UTF-8 text split into locations. A line starting with `=`
//! opens a location; the first location is the entry point run by a restart.
//! Blank lines and lines starting with `#` are skipped. Everything else is
//! one statement line; `&` outside single quotes chains several statements
//! on one line.
//!
//! ```text
//! = START
//! print You are in the hall.
//! act Look around|print Dust everywhere.
//! act Leave|goto EXIT
//!
//! = EXIT
//! print You step outside.
//! ```
//!
//! # Statements
//!
//! | Statement | Effect |
//! |---|---|
//! | `print TEXT` | append a line to the main description |
//! | `pane TEXT` | append a line to the supplementary description |
//! | `clear` | clear the main description |
//! | `act TITLE\|CODE` | add an action whose code runs on execution |
//! | `delact TITLE` | remove an action by title |
//! | `obj NAME` / `obj NAME\|IMAGE` | add an inventory object |
//! | `delobj NAME` | remove an inventory object |
//! | `goto NAME` | enter a location: fresh scene, then run its code |
//! | `gosub NAME` | run a location in place, current scene kept |
//! | `menu LABEL:TARGET;…` | publish the pending menu and show it |
//! | `msg TEXT` | show a message through the host |
//! | `image FILE` | show an image through the host |
//! | `play FILE\|VOLUME` / `stop` | audio control through the host |
//! | `wait MS` / `timer MS` | pause / set the tick interval via the host |
//! | `ask VAR\|PROMPT` | prompt the host for a line of text |
//! | `uptime VAR` | store the host's millisecond counter |
//! | `include FILE` | append locations fetched through the host |
//! | `savegame NAME` / `opengame NAME` | ask the host to save / load |
//! | `show PANE` / `hide PANE` | toggle a window pane |
//! | `roll VAR\|MAX` | store a die roll in `1..=MAX` |
//! | `dbg TEXT` | forward text to the host debugger when debugging |
//! | `refresh` | force a full view refresh |
//! | `halt` | disable execution for the rest of the session |
//! | `NAME = EXPR` / `NAME[I] = EXPR` | assignment |
//!
//! Expressions cover integer arithmetic (`+ - * /`, parentheses), single
//! quoted text, and variable reads. Reading a variable a script never
//! assigned yields `0`; the host-facing [`Engine::variable`] read of the
//! same name fails instead. Variable names are case-insensitive and stored
//! uppercase. Each location run binds `ARGS` to its arguments and restores
//! the previous binding afterwards; the pending input line mirrors into
//! `USER_TEXT`.
//!
//! Faults use the historical code table
//! ([`error_codes`](crate::error_codes)): division by zero is 100, a
//! missing location 111, a malformed world 105, and so on. A fault or a
//! `halt` stops every enclosing block.

use std::collections::BTreeMap;
use std::mem;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::engine::{Engine, MenuItem, Value, WindowKind};
use crate::error::VariableError;
use crate::error_codes::FaultCode;
use crate::session::EngineCtx;
use crate::snapshot::ListEntry;

/// Byte width of one encoded text unit in status buffers (UTF-16LE).
pub const STATUS_UNIT_WIDTH: usize = 2;

/// Fixed seed so `roll` outcomes are reproducible across runs.
const RNG_SEED: u64 = 0x0d1e;

/// Nested location runs beyond this depth fault with code 102 instead of
/// exhausting the real stack.
const MAX_RUN_DEPTH: u32 = 64;

#[derive(Debug, Clone)]
struct Location {
    name: String,
    code: Vec<String>,
}

#[derive(Debug, Clone)]
struct World {
    locations: Vec<Location>,
}

impl World {
    fn find(&self, name: &str) -> Option<usize> {
        self.locations
            .iter()
            .position(|loc| loc.name.eq_ignore_ascii_case(name))
    }
}

/// Where the interpreter currently is; swapped in and out around each run.
#[derive(Debug, Clone, Default)]
struct Frame {
    location: Option<String>,
    action: Option<usize>,
    line: usize,
}

/// Whether the current block keeps running after a statement.
enum Flow {
    Continue,
    Stop,
}

/// Everything [`Engine::save_status`] captures. The world itself is not
/// part of it; a status buffer only makes sense against the same world.
#[derive(Debug, Serialize, Deserialize)]
struct SaveRecord {
    source: Option<String>,
    location: Option<String>,
    variables: BTreeMap<String, Vec<Value>>,
    main_description: String,
    extra_description: String,
    action_entries: Vec<ListEntry>,
    action_codes: Vec<String>,
    objects: Vec<ListEntry>,
    selected_action: Option<usize>,
    selected_object: Option<usize>,
    input_text: String,
    windows: [bool; 4],
}

/// The deterministic interpreter behind the CLI host and the test-suite.
#[derive(Debug)]
pub struct ScriptedEngine {
    world: Option<World>,
    source: Option<String>,
    vars: BTreeMap<String, Vec<Value>>,
    current: Option<usize>,
    main_description: String,
    main_changed: bool,
    extra_description: String,
    extra_changed: bool,
    action_entries: Vec<ListEntry>,
    action_codes: Vec<String>,
    actions_changed: bool,
    objects: Vec<ListEntry>,
    objects_changed: bool,
    selected_action: Option<usize>,
    selected_object: Option<usize>,
    menu: Vec<MenuItem>,
    input_text: String,
    windows: [bool; 4],
    full_refreshes: u32,
    debug: bool,
    exec: Frame,
    run_depth: u32,
    rng: StdRng,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            world: None,
            source: None,
            vars: BTreeMap::new(),
            current: None,
            main_description: String::new(),
            main_changed: false,
            extra_description: String::new(),
            extra_changed: false,
            action_entries: Vec::new(),
            action_codes: Vec::new(),
            actions_changed: false,
            objects: Vec::new(),
            objects_changed: false,
            selected_action: None,
            selected_object: None,
            menu: Vec::new(),
            input_text: String::new(),
            windows: [true; 4],
            full_refreshes: 0,
            debug: false,
            exec: Frame::default(),
            run_depth: 0,
            rng: StdRng::seed_from_u64(RNG_SEED),
        }
    }
}

impl ScriptedEngine {
    /// Fresh engine with no world loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and installs a world without going through the guarded load
    /// path. Invalid text leaves no world loaded and logs the reason; the
    /// next restart then faults with code 106.
    pub fn load_world_direct(&mut self, source: &str) {
        match parse_world(source) {
            Ok(world) => {
                debug!(locations = world.locations.len(), "world installed directly");
                self.clear_dynamic();
                self.world = Some(world);
                self.source = None;
            }
            Err(reason) => {
                warn!(reason, "world text rejected");
            }
        }
    }

    /// Drops all per-game state; the loaded world and its source survive.
    fn clear_dynamic(&mut self) {
        self.vars.clear();
        self.current = None;
        self.main_description.clear();
        self.main_changed = false;
        self.extra_description.clear();
        self.extra_changed = false;
        self.action_entries.clear();
        self.action_codes.clear();
        self.actions_changed = false;
        self.objects.clear();
        self.objects_changed = false;
        self.selected_action = None;
        self.selected_object = None;
        self.menu.clear();
        self.input_text.clear();
        self.exec = Frame::default();
    }

    /// Reports `code` at the current execution position.
    fn fault(&mut self, ctx: &mut EngineCtx<'_>, code: FaultCode) {
        ctx.report_fault(
            code.as_raw(),
            self.exec.location.as_deref(),
            self.exec.action,
            self.exec.line,
        );
    }

    fn write_var(&mut self, name: String, index: usize, value: Value) {
        let slot = self.vars.entry(name).or_default();
        if slot.len() <= index {
            slot.resize(index + 1, Value::Int(0));
        }
        slot[index] = value;
    }

    /// Runs the lines of a block, statement by statement. A latched fault or
    /// a halt stops the block; nesting past [`MAX_RUN_DEPTH`] faults instead
    /// of overflowing the stack.
    fn run_block(&mut self, ctx: &mut EngineCtx<'_>, lines: &[String]) {
        if self.run_depth >= MAX_RUN_DEPTH {
            self.fault(ctx, FaultCode::StackOverflow);
            return;
        }
        self.run_depth += 1;
        'block: for (number, line) in lines.iter().enumerate() {
            self.exec.line = number + 1;
            for stmt in split_statements(line) {
                if ctx.fault_latched() || ctx.execution_disabled() {
                    break 'block;
                }
                trace!(stmt, "running statement");
                if let Flow::Stop = self.exec_statement(ctx, stmt) {
                    break 'block;
                }
            }
        }
        self.run_depth -= 1;
    }

    /// Enters a location: the scene is repainted from scratch (main
    /// description, actions, and pending menu dropped), then its code runs.
    /// Inventory objects and variables persist across entries.
    fn enter_location(&mut self, ctx: &mut EngineCtx<'_>, index: usize, args: &[Value]) {
        self.current = Some(index);
        self.main_description.clear();
        self.main_changed = true;
        self.action_entries.clear();
        self.action_codes.clear();
        self.selected_action = None;
        self.actions_changed = true;
        self.menu.clear();
        self.run_location_block(ctx, index, args);
    }

    /// Runs a location's code in place, with `ARGS` bound to `args` for the
    /// duration and the previous binding restored afterwards.
    fn run_location_block(&mut self, ctx: &mut EngineCtx<'_>, index: usize, args: &[Value]) {
        let (name, lines) = {
            let Some(world) = self.world.as_ref() else {
                self.fault(ctx, FaultCode::GameNotLoaded);
                return;
            };
            let Some(loc) = world.locations.get(index) else {
                self.fault(ctx, FaultCode::LocationNotFound);
                return;
            };
            (loc.name.clone(), loc.code.clone())
        };
        let prev_frame = mem::replace(
            &mut self.exec,
            Frame {
                location: Some(name),
                action: None,
                line: 0,
            },
        );
        let prev_args = self.vars.insert("ARGS".to_owned(), args.to_vec());
        self.run_block(ctx, &lines);
        match prev_args {
            Some(values) => {
                self.vars.insert("ARGS".to_owned(), values);
            }
            None => {
                self.vars.remove("ARGS");
            }
        }
        self.exec = prev_frame;
    }

    fn statement_window_kind(name: &str) -> Option<WindowKind> {
        WindowKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name.trim().to_ascii_lowercase())
    }

    fn exec_assignment(&mut self, ctx: &mut EngineCtx<'_>, stmt: &str) {
        let Some((lhs, rhs)) = stmt.split_once('=') else {
            self.fault(ctx, FaultCode::EqualsNotFound);
            return;
        };
        let lhs = lhs.trim();
        let (name, index) = if let Some((name, idx)) = lhs.split_once('[') {
            let Some(idx) = idx.trim_end().strip_suffix(']') else {
                self.fault(ctx, FaultCode::BracketNotFound);
                return;
            };
            let index = match eval_expression(&self.vars, idx) {
                Ok(Value::Int(n)) if n >= 0 => n.unsigned_abs() as usize,
                Ok(_) => {
                    self.fault(ctx, FaultCode::TypeMismatch);
                    return;
                }
                Err(code) => {
                    self.fault(ctx, code);
                    return;
                }
            };
            (name.trim(), index)
        } else {
            (lhs, 0)
        };
        if !is_valid_var_name(name) {
            self.fault(ctx, FaultCode::InvalidVarName);
            return;
        }
        match eval_expression(&self.vars, rhs) {
            Ok(value) => self.write_var(name.to_ascii_uppercase(), index, value),
            Err(code) => self.fault(ctx, code),
        }
    }

    fn exec_statement(&mut self, ctx: &mut EngineCtx<'_>, stmt: &str) -> Flow {
        let (head, rest) = stmt
            .split_once(char::is_whitespace)
            .map_or((stmt, ""), |(head, rest)| (head, rest.trim()));
        match head.to_ascii_lowercase().as_str() {
            "print" => {
                self.main_description.push_str(rest);
                self.main_description.push('\n');
                self.main_changed = true;
            }
            "pane" => {
                self.extra_description.push_str(rest);
                self.extra_description.push('\n');
                self.extra_changed = true;
            }
            "clear" => {
                self.main_description.clear();
                self.main_changed = true;
            }
            "act" => {
                let Some((title, code)) = rest.split_once('|') else {
                    self.fault(ctx, FaultCode::CantAddAction);
                    return Flow::Continue;
                };
                let title = title.trim();
                if title.is_empty() {
                    self.fault(ctx, FaultCode::CantAddAction);
                    return Flow::Continue;
                }
                self.action_entries.push(ListEntry {
                    image: None,
                    description: title.to_owned(),
                });
                self.action_codes.push(code.trim().to_owned());
                self.actions_changed = true;
            }
            "delact" => {
                if let Some(index) = self
                    .action_entries
                    .iter()
                    .position(|entry| entry.description == rest)
                {
                    self.action_entries.remove(index);
                    self.action_codes.remove(index);
                    self.actions_changed = true;
                    if self.selected_action.is_some_and(|s| s >= self.action_entries.len()) {
                        self.selected_action = None;
                    }
                }
            }
            "obj" => {
                let (name, image) = match rest.split_once('|') {
                    Some((name, image)) => (name.trim(), Some(image.trim().to_owned())),
                    None => (rest, None),
                };
                if name.is_empty() {
                    self.fault(ctx, FaultCode::CantAddObject);
                    return Flow::Continue;
                }
                self.objects.push(ListEntry {
                    image,
                    description: name.to_owned(),
                });
                self.objects_changed = true;
            }
            "delobj" => {
                if let Some(index) = self.objects.iter().position(|entry| entry.description == rest)
                {
                    self.objects.remove(index);
                    self.objects_changed = true;
                    if self.selected_object.is_some_and(|s| s >= self.objects.len()) {
                        self.selected_object = None;
                    }
                }
            }
            "goto" => {
                let Some(world) = self.world.as_ref() else {
                    self.fault(ctx, FaultCode::GameNotLoaded);
                    return Flow::Continue;
                };
                let Some(index) = world.find(rest) else {
                    self.fault(ctx, FaultCode::LocationNotFound);
                    return Flow::Continue;
                };
                self.enter_location(ctx, index, &[]);
                // a jump never falls back into the old block
                return Flow::Stop;
            }
            "gosub" => {
                self.run_location(ctx, rest, &[]);
            }
            "menu" => {
                let mut items = Vec::new();
                for part in rest.split(';') {
                    let mut fields = part.splitn(3, ':');
                    let label = fields.next().unwrap_or("").trim();
                    let target = fields.next().unwrap_or("").trim();
                    let image = fields.next().map(|s| s.trim().to_owned());
                    if label.is_empty() || target.is_empty() {
                        self.fault(ctx, FaultCode::CantAddMenuItem);
                        return Flow::Continue;
                    }
                    items.push(MenuItem {
                        label: label.to_owned(),
                        image,
                        target: target.to_owned(),
                    });
                }
                // published before the show callback, so a handler that
                // selects a row re-enters against the live rows
                self.menu = items.clone();
                for item in &items {
                    ctx.call_add_menu_item(self, &item.label, item.image.as_deref());
                }
                ctx.call_show_menu(self);
            }
            "msg" => {
                ctx.call_show_message(self, rest);
            }
            "image" => {
                ctx.call_show_image(self, rest);
            }
            "play" => {
                let (file, volume) = match rest.split_once('|') {
                    Some((file, vol)) => match vol.trim().parse::<i32>() {
                        Ok(volume) => (file.trim(), volume),
                        Err(_) => {
                            self.fault(ctx, FaultCode::Syntax);
                            return Flow::Continue;
                        }
                    },
                    None => (rest, 100),
                };
                let file = file.to_owned();
                if !file.is_empty() && ctx.call_is_playing_file(self, &file) {
                    ctx.call_close_file(self, &file);
                }
                ctx.call_play_file(self, &file, volume);
            }
            "stop" => {
                ctx.call_close_file(self, rest);
            }
            "wait" => match rest.parse::<u32>() {
                Ok(ms) => ctx.call_sleep(self, ms),
                Err(_) => self.fault(ctx, FaultCode::Syntax),
            },
            "timer" => match rest.parse::<u32>() {
                Ok(ms) => ctx.call_set_timer(self, ms),
                Err(_) => self.fault(ctx, FaultCode::Syntax),
            },
            "ask" => {
                let Some((name, prompt)) = rest.split_once('|') else {
                    self.fault(ctx, FaultCode::Syntax);
                    return Flow::Continue;
                };
                let name = name.trim();
                if !is_valid_var_name(name) {
                    self.fault(ctx, FaultCode::InvalidVarName);
                    return Flow::Continue;
                }
                let reply = ctx.call_input_box(self, prompt.trim());
                self.write_var(name.to_ascii_uppercase(), 0, Value::Text(reply));
            }
            "uptime" => {
                let name = rest.trim();
                if !is_valid_var_name(name) {
                    self.fault(ctx, FaultCode::InvalidVarName);
                    return Flow::Continue;
                }
                let ms = ctx.call_get_ms_count(self);
                let value = i32::try_from(ms).unwrap_or(i32::MAX);
                self.write_var(name.to_ascii_uppercase(), 0, Value::Int(value));
            }
            "include" => {
                let bytes = ctx.call_get_file_content(self, rest);
                if bytes.is_empty() {
                    self.fault(ctx, FaultCode::CantIncludeFile);
                    return Flow::Continue;
                }
                let Ok(text) = std::str::from_utf8(&bytes) else {
                    self.fault(ctx, FaultCode::CantIncludeFile);
                    return Flow::Continue;
                };
                let extra = match parse_world(text) {
                    Ok(world) => world,
                    Err(reason) => {
                        debug!(file = rest, reason, "included file rejected");
                        self.fault(ctx, FaultCode::CantIncludeFile);
                        return Flow::Continue;
                    }
                };
                let Some(world) = self.world.as_mut() else {
                    self.fault(ctx, FaultCode::GameNotLoaded);
                    return Flow::Continue;
                };
                for loc in extra.locations {
                    if world.find(&loc.name).is_some() {
                        trace!(name = loc.name, "included location already exists, skipping");
                    } else {
                        world.locations.push(loc);
                    }
                }
            }
            "savegame" => {
                ctx.call_save_game_status(self, rest);
            }
            "opengame" => {
                ctx.call_open_game_status(self, rest);
            }
            "show" | "hide" => {
                let visible = head.eq_ignore_ascii_case("show");
                let Some(kind) = Self::statement_window_kind(rest) else {
                    self.fault(ctx, FaultCode::Syntax);
                    return Flow::Continue;
                };
                self.windows[kind.index()] = visible;
                ctx.call_show_window(self, kind, visible);
            }
            "roll" => {
                let Some((name, max)) = rest.split_once('|') else {
                    self.fault(ctx, FaultCode::Syntax);
                    return Flow::Continue;
                };
                let name = name.trim();
                if !is_valid_var_name(name) {
                    self.fault(ctx, FaultCode::InvalidVarName);
                    return Flow::Continue;
                }
                let Ok(max) = max.trim().parse::<i32>() else {
                    self.fault(ctx, FaultCode::Syntax);
                    return Flow::Continue;
                };
                if max < 1 {
                    self.fault(ctx, FaultCode::Syntax);
                    return Flow::Continue;
                }
                let value = self.rng.random_range(1..=max);
                self.write_var(name.to_ascii_uppercase(), 0, Value::Int(value));
            }
            "dbg" => {
                if self.debug {
                    ctx.call_debug(self, rest);
                } else {
                    trace!(text = rest, "debug output suppressed");
                }
            }
            "refresh" => {
                self.full_refreshes += 1;
                ctx.call_refresh_int(self);
            }
            "halt" => {
                ctx.disable_execution();
                return Flow::Stop;
            }
            _ if stmt.contains('=') => {
                self.exec_assignment(ctx, stmt);
            }
            _ => {
                debug!(stmt, "unknown statement");
                self.fault(ctx, FaultCode::UnknownAction);
            }
        }
        Flow::Continue
    }
}

impl Engine for ScriptedEngine {
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn reset(&mut self) {
        self.clear_dynamic();
        self.windows = [true; 4];
        self.full_refreshes = 0;
        self.debug = false;
        self.rng = StdRng::seed_from_u64(RNG_SEED);
    }

    fn clear_world(&mut self) {
        self.clear_dynamic();
        self.world = None;
        self.source = None;
    }

    fn begin_run(&mut self) {
        self.main_changed = false;
        self.extra_changed = false;
        self.actions_changed = false;
        self.objects_changed = false;
    }

    fn load_world(&mut self, ctx: &mut EngineCtx<'_>, padded: &[u8], source_name: &str) {
        let end = padded.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let Ok(text) = std::str::from_utf8(&padded[..end]) else {
            self.fault(ctx, FaultCode::CantLoadFile);
            return;
        };
        match parse_world(text) {
            Ok(world) => {
                debug!(
                    locations = world.locations.len(),
                    source_name, "world loaded"
                );
                self.clear_dynamic();
                self.world = Some(world);
                self.source = Some(source_name.to_owned());
                let dir = std::path::Path::new(source_name)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if !dir.is_empty() {
                    ctx.call_change_quest_path(self, &dir);
                }
            }
            Err(reason) => {
                debug!(source_name, reason, "world rejected");
                self.fault(ctx, FaultCode::CantLoadFile);
            }
        }
    }

    fn restart(&mut self, ctx: &mut EngineCtx<'_>) {
        if self.world.is_none() {
            self.fault(ctx, FaultCode::GameNotLoaded);
            return;
        }
        self.clear_dynamic();
        self.windows = [true; 4];
        self.rng = StdRng::seed_from_u64(RNG_SEED);
        self.enter_location(ctx, 0, &[]);
    }

    fn run_code(&mut self, ctx: &mut EngineCtx<'_>, code: &str) {
        let lines: Vec<String> = code.lines().map(str::to_owned).collect();
        let location = self.current_location().map(str::to_owned);
        let prev = mem::replace(
            &mut self.exec,
            Frame {
                location,
                action: None,
                line: 0,
            },
        );
        self.run_block(ctx, &lines);
        self.exec = prev;
    }

    fn run_location(&mut self, ctx: &mut EngineCtx<'_>, name: &str, args: &[Value]) {
        let Some(index) = self.world.as_ref().and_then(|w| w.find(name)) else {
            self.fault(ctx, FaultCode::LocationNotFound);
            return;
        };
        self.run_location_block(ctx, index, args);
    }

    fn run_hook(&mut self, ctx: &mut EngineCtx<'_>, hook: &str) {
        let target = match self
            .vars
            .get(&hook.to_ascii_uppercase())
            .and_then(|values| values.first())
        {
            Some(Value::Text(name)) if !name.trim().is_empty() => name.trim().to_owned(),
            _ => {
                trace!(hook, "hook not bound, nothing to run");
                return;
            }
        };
        self.run_location(ctx, &target, &[]);
    }

    fn run_action(&mut self, ctx: &mut EngineCtx<'_>, index: usize) {
        let Some(code) = self.action_codes.get(index).cloned() else {
            trace!(index, "no action at that index");
            return;
        };
        let location = self.current_location().map(str::to_owned);
        let prev = mem::replace(
            &mut self.exec,
            Frame {
                location,
                action: Some(index),
                line: 0,
            },
        );
        let lines = vec![code];
        self.run_block(ctx, &lines);
        self.exec = prev;
    }

    fn status_unit_width(&self) -> usize {
        STATUS_UNIT_WIDTH
    }

    fn save_status(&mut self, _ctx: &mut EngineCtx<'_>) -> Vec<u8> {
        if self.world.is_none() {
            return Vec::new();
        }
        let record = SaveRecord {
            source: self.source.clone(),
            location: self.current_location().map(str::to_owned),
            variables: self.vars.clone(),
            main_description: self.main_description.clone(),
            extra_description: self.extra_description.clone(),
            action_entries: self.action_entries.clone(),
            action_codes: self.action_codes.clone(),
            objects: self.objects.clone(),
            selected_action: self.selected_action,
            selected_object: self.selected_object,
            input_text: self.input_text.clone(),
            windows: self.windows,
        };
        match serde_json::to_string(&record) {
            Ok(json) => encode_utf16_le(&json),
            Err(err) => {
                warn!(%err, "state encode failed");
                Vec::new()
            }
        }
    }

    fn load_status(&mut self, ctx: &mut EngineCtx<'_>, padded: &[u8]) {
        if self.world.is_none() {
            self.fault(ctx, FaultCode::GameNotLoaded);
            return;
        }
        let text = match decode_utf16_le(padded) {
            Ok(text) => text,
            Err(err) => {
                debug!(%err, "status buffer is not valid UTF-16");
                self.fault(ctx, FaultCode::CantLoadFile);
                return;
            }
        };
        let record: SaveRecord = match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(err) => {
                debug!(%err, "status buffer did not decode");
                self.fault(ctx, FaultCode::CantLoadFile);
                return;
            }
        };
        let location = match record.location {
            Some(ref name) => {
                let Some(index) = self.world.as_ref().and_then(|w| w.find(name)) else {
                    debug!(name, "saved location is not in the loaded world");
                    self.fault(ctx, FaultCode::CantLoadFile);
                    return;
                };
                Some(index)
            }
            None => None,
        };
        if record.source != self.source {
            trace!(
                saved = record.source.as_deref(),
                loaded = self.source.as_deref(),
                "status buffer came from a different source"
            );
        }
        self.clear_dynamic();
        self.current = location;
        self.vars = record.variables;
        self.main_description = record.main_description;
        self.extra_description = record.extra_description;
        self.action_entries = record.action_entries;
        self.action_codes = record.action_codes;
        self.objects = record.objects;
        self.selected_action = record.selected_action;
        self.selected_object = record.selected_object;
        self.input_text = record.input_text;
        self.windows = record.windows;
        // the whole view is stale after a restore
        self.main_changed = true;
        self.extra_changed = true;
        self.actions_changed = true;
        self.objects_changed = true;
    }

    fn current_location(&self) -> Option<&str> {
        let world = self.world.as_ref()?;
        let index = self.current?;
        world.locations.get(index).map(|loc| loc.name.as_str())
    }

    fn execution_location(&self) -> Option<&str> {
        self.exec.location.as_deref()
    }

    fn execution_action_index(&self) -> Option<usize> {
        self.exec.action
    }

    fn execution_line(&self) -> usize {
        self.exec.line
    }

    fn main_description(&self) -> &str {
        &self.main_description
    }

    fn main_description_changed(&self) -> bool {
        self.main_changed
    }

    fn extra_description(&self) -> &str {
        &self.extra_description
    }

    fn extra_description_changed(&self) -> bool {
        self.extra_changed
    }

    fn actions(&self) -> &[ListEntry] {
        &self.action_entries
    }

    fn actions_changed(&self) -> bool {
        self.actions_changed
    }

    fn objects(&self) -> &[ListEntry] {
        &self.objects
    }

    fn objects_changed(&self) -> bool {
        self.objects_changed
    }

    fn selected_action(&self) -> Option<usize> {
        self.selected_action
    }

    fn set_selected_action(&mut self, index: Option<usize>) {
        self.selected_action = index;
    }

    fn selected_object(&self) -> Option<usize> {
        self.selected_object
    }

    fn set_selected_object(&mut self, index: Option<usize>) {
        self.selected_object = index;
    }

    fn menu_items(&self) -> &[MenuItem] {
        &self.menu
    }

    fn variable(&self, name: &str, index: usize) -> Result<Value, VariableError> {
        let canonical = name.trim().to_ascii_uppercase();
        let Some(values) = self.vars.get(&canonical) else {
            return Err(VariableError::NotFound { name: canonical });
        };
        values
            .get(index)
            .cloned()
            .ok_or(VariableError::IndexOutOfRange {
                index,
                count: values.len(),
            })
    }

    fn variable_count(&self, name: &str) -> Result<usize, VariableError> {
        let canonical = name.trim().to_ascii_uppercase();
        self.vars
            .get(&canonical)
            .map(Vec::len)
            .ok_or(VariableError::NotFound { name: canonical })
    }

    fn set_input_text(&mut self, text: &str) {
        self.input_text = text.to_owned();
        self.write_var("USER_TEXT".to_owned(), 0, Value::Text(text.to_owned()));
    }

    fn window_visible(&self, kind: WindowKind) -> bool {
        self.windows[kind.index()]
    }

    fn set_window_visible(&mut self, kind: WindowKind, visible: bool) {
        self.windows[kind.index()] = visible;
    }

    fn full_refresh_count(&self) -> u32 {
        self.full_refreshes
    }

    fn world_source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    fn debug(&self) -> bool {
        self.debug
    }
}

/// Splits a line into statements on `&`, leaving single-quoted spans intact.
fn split_statements(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '&' if !in_quote => {
                parts.push(line[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(line[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_world(text: &str) -> Result<World, String> {
    let mut locations: Vec<Location> = Vec::new();
    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('=') {
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("line {}: location header without a name", number + 1));
            }
            if locations.iter().any(|loc| loc.name.eq_ignore_ascii_case(name)) {
                return Err(format!("line {}: duplicate location `{name}`", number + 1));
            }
            locations.push(Location {
                name: name.to_owned(),
                code: Vec::new(),
            });
        } else if let Some(last) = locations.last_mut() {
            last.code.push(line.to_owned());
        } else {
            return Err(format!(
                "line {}: code before the first location header",
                number + 1
            ));
        }
    }
    if locations.is_empty() {
        return Err("no locations".to_owned());
    }
    Ok(World { locations })
}

fn encode_utf16_le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * STATUS_UNIT_WIDTH);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decodes UTF-16LE up to the first `0x0000` unit; the bridge guarantees one
/// is present by over-allocating the working copy.
fn decode_utf16_le(padded: &[u8]) -> Result<String, std::string::FromUtf16Error> {
    let mut units = Vec::with_capacity(padded.len() / STATUS_UNIT_WIDTH);
    for pair in padded.chunks_exact(STATUS_UNIT_WIDTH) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    String::from_utf16(&units)
}

/// Expression grammar: `+`/`-` over `*`/`/` over unary minus over atoms
/// (integer, quoted text, variable read, parenthesized expression).
///
/// Reads are pure against the variable store; faults come back as codes for
/// the caller to report at the right position.
fn eval_expression(vars: &BTreeMap<String, Vec<Value>>, text: &str) -> Result<Value, FaultCode> {
    let mut parser = ExprParser {
        chars: text.chars().collect(),
        pos: 0,
        vars,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(FaultCode::Syntax);
    }
    Ok(value)
}

struct ExprParser<'a> {
    chars: Vec<char>,
    pos: usize,
    vars: &'a BTreeMap<String, Vec<Value>>,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<Value, FaultCode> {
        let mut left = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    let right = self.term()?;
                    left = add_values(left, right);
                }
                Some('-') => {
                    self.pos += 1;
                    let right = self.term()?;
                    left = int_op(left, right, i32::wrapping_sub)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Value, FaultCode> {
        let mut left = self.unary()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    let right = self.unary()?;
                    left = int_op(left, right, i32::wrapping_mul)?;
                }
                Some('/') => {
                    self.pos += 1;
                    let right = self.unary()?;
                    let (a, b) = as_ints(left, right)?;
                    if b == 0 {
                        return Err(FaultCode::DivisionByZero);
                    }
                    left = Value::Int(a.wrapping_div(b));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Value, FaultCode> {
        self.skip_ws();
        if self.peek() == Some('-') {
            self.pos += 1;
            return match self.unary()? {
                Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                Value::Text(_) => Err(FaultCode::TypeMismatch),
            };
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Value, FaultCode> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(FaultCode::BracketNotFound);
                }
                self.pos += 1;
                Ok(value)
            }
            Some('\'') => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.peek() {
                        Some('\'') => {
                            self.pos += 1;
                            return Ok(Value::Text(out));
                        }
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        None => return Err(FaultCode::QuoteNotFound),
                    }
                }
            }
            Some(c) if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(d) = self.peek().filter(char::is_ascii_digit) {
                    digits.push(d);
                    self.pos += 1;
                }
                digits.parse().map(Value::Int).map_err(|_| FaultCode::Syntax)
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self
                    .peek()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                {
                    name.push(c);
                    self.pos += 1;
                }
                self.skip_ws();
                let index = if self.peek() == Some('[') {
                    self.pos += 1;
                    let idx = self.expr()?;
                    self.skip_ws();
                    if self.peek() != Some(']') {
                        return Err(FaultCode::BracketNotFound);
                    }
                    self.pos += 1;
                    match idx {
                        Value::Int(n) if n >= 0 => n.unsigned_abs() as usize,
                        _ => return Err(FaultCode::TypeMismatch),
                    }
                } else {
                    0
                };
                // a name the script never assigned reads as zero in place;
                // only the host-facing variable read reports it as missing
                Ok(self
                    .vars
                    .get(&name.to_ascii_uppercase())
                    .and_then(|values| values.get(index))
                    .cloned()
                    .unwrap_or(Value::Int(0)))
            }
            _ => Err(FaultCode::Syntax),
        }
    }
}

fn add_values(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (left, right) => Value::Text(format!("{left}{right}")),
    }
}

fn as_ints(left: Value, right: Value) -> Result<(i32, i32), FaultCode> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok((a, b)),
        _ => Err(FaultCode::TypeMismatch),
    }
}

fn int_op(left: Value, right: Value, op: fn(i32, i32) -> i32) -> Result<Value, FaultCode> {
    let (a, b) = as_ints(left, right)?;
    Ok(Value::Int(op(a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::CallbackTable;
    use crate::session::SessionState;

    fn vars() -> BTreeMap<String, Vec<Value>> {
        let mut map = BTreeMap::new();
        map.insert("HP".to_owned(), vec![Value::Int(7), Value::Int(9)]);
        map.insert("NAME".to_owned(), vec![Value::Text("Ada".to_owned())]);
        map
    }

    fn run(engine: &mut ScriptedEngine, code: &str) -> i32 {
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.run_code(&mut ctx, code);
        state.last_error.code
    }

    fn started(world: &str) -> ScriptedEngine {
        let mut engine = ScriptedEngine::new();
        engine.load_world_direct(world);
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.restart(&mut ctx);
        assert_eq!(state.last_error.code, 0, "restart faulted");
        engine
    }

    // --- expressions ---

    #[test]
    fn arithmetic_precedence_and_parens() {
        let vars = BTreeMap::new();
        assert_eq!(eval_expression(&vars, "2 + 3 * 4"), Ok(Value::Int(14)));
        assert_eq!(eval_expression(&vars, "(2 + 3) * 4"), Ok(Value::Int(20)));
        assert_eq!(eval_expression(&vars, "10 - 2 - 3"), Ok(Value::Int(5)));
        assert_eq!(eval_expression(&vars, "-4 + 1"), Ok(Value::Int(-3)));
        assert_eq!(eval_expression(&vars, "9 / 2"), Ok(Value::Int(4)));
    }

    #[test]
    fn text_concatenation_and_mismatches() {
        let vars = vars();
        assert_eq!(
            eval_expression(&vars, "'Hello ' + NAME"),
            Ok(Value::Text("Hello Ada".to_owned()))
        );
        assert_eq!(
            eval_expression(&vars, "NAME + 1"),
            Ok(Value::Text("Ada1".to_owned()))
        );
        assert_eq!(
            eval_expression(&vars, "NAME * 2"),
            Err(FaultCode::TypeMismatch)
        );
        assert_eq!(eval_expression(&vars, "-NAME"), Err(FaultCode::TypeMismatch));
    }

    #[test]
    fn division_by_zero_is_code_100() {
        let vars = BTreeMap::new();
        assert_eq!(eval_expression(&vars, "1 / 0"), Err(FaultCode::DivisionByZero));
        assert_eq!(FaultCode::DivisionByZero.as_raw(), 100);
    }

    #[test]
    fn variable_reads_default_to_zero_in_expressions() {
        let vars = vars();
        assert_eq!(eval_expression(&vars, "hp"), Ok(Value::Int(7)));
        assert_eq!(eval_expression(&vars, "HP[1]"), Ok(Value::Int(9)));
        assert_eq!(eval_expression(&vars, "HP[5]"), Ok(Value::Int(0)));
        assert_eq!(eval_expression(&vars, "NEVER_SET"), Ok(Value::Int(0)));
    }

    #[test]
    fn malformed_expressions_report_the_specific_code() {
        let vars = BTreeMap::new();
        assert_eq!(eval_expression(&vars, "'open"), Err(FaultCode::QuoteNotFound));
        assert_eq!(eval_expression(&vars, "(1 + 2"), Err(FaultCode::BracketNotFound));
        assert_eq!(eval_expression(&vars, "X[1"), Err(FaultCode::BracketNotFound));
        assert_eq!(eval_expression(&vars, "1 2"), Err(FaultCode::Syntax));
        assert_eq!(eval_expression(&vars, ""), Err(FaultCode::Syntax));
    }

    // --- statement splitting ---

    #[test]
    fn ampersand_chains_statements_outside_quotes() {
        assert_eq!(split_statements("X = 1 & Y = 2"), vec!["X = 1", "Y = 2"]);
        assert_eq!(split_statements("X = 'a & b'"), vec!["X = 'a & b'"]);
        assert_eq!(split_statements("  "), Vec::<&str>::new());
    }

    // --- world parsing ---

    #[test]
    fn world_parse_rejects_malformed_text() {
        assert!(parse_world("").is_err());
        assert!(parse_world("print stray\n= A\n").is_err());
        assert!(parse_world("=\nprint x\n").is_err());
        assert!(parse_world("= A\n= a\n").is_err(), "names are case-insensitive");
        assert!(parse_world("# only a comment\n").is_err());
    }

    #[test]
    fn world_parse_keeps_location_order_and_skips_noise() {
        let world = parse_world("# header\n= A\nprint one\n\n= B\nprint two\n").unwrap();
        assert_eq!(world.locations.len(), 2);
        assert_eq!(world.locations[0].name, "A");
        assert_eq!(world.locations[0].code, vec!["print one"]);
        assert_eq!(world.find("b"), Some(1));
        assert_eq!(world.find("C"), None);
    }

    // --- engine behavior ---

    #[test]
    fn assignments_grow_arrays_with_zero_fill() {
        let mut engine = started("= START\nprint hi\n");
        assert_eq!(run(&mut engine, "HP[2] = 5"), 0);
        assert_eq!(engine.variable("HP", 2), Ok(Value::Int(5)));
        assert_eq!(engine.variable("HP", 0), Ok(Value::Int(0)));
        assert_eq!(engine.variable_count("HP"), Ok(3));
        assert_eq!(
            engine.variable("HP", 3),
            Err(VariableError::IndexOutOfRange { index: 3, count: 3 })
        );
        assert_eq!(
            engine.variable("MP", 0),
            Err(VariableError::NotFound { name: "MP".to_owned() })
        );
    }

    #[test]
    fn invalid_variable_names_fault_with_114() {
        let mut engine = started("= START\nprint hi\n");
        assert_eq!(run(&mut engine, "2BAD = 1"), FaultCode::InvalidVarName.as_raw());
        assert_eq!(run(&mut engine, "'X' = 1"), FaultCode::InvalidVarName.as_raw());
    }

    #[test]
    fn unknown_statements_fault_with_119() {
        let mut engine = started("= START\nprint hi\n");
        assert_eq!(run(&mut engine, "frobnicate now"), FaultCode::UnknownAction.as_raw());
    }

    #[test]
    fn halt_stops_the_rest_of_the_chain() {
        let mut engine = started("= START\nprint hi\n");
        assert_eq!(run(&mut engine, "X = 1 & halt & X = 2"), 0);
        assert_eq!(engine.variable("X", 0), Ok(Value::Int(1)));
    }

    #[test]
    fn fault_stops_the_enclosing_blocks() {
        let mut engine = started("= START\nprint hi\n\n= BOOM\nY = 1 / 0\nY = 9\n");
        assert_eq!(
            run(&mut engine, "gosub BOOM\nX = 3"),
            FaultCode::DivisionByZero.as_raw()
        );
        // the faulting line never wrote, the line after it never ran, and
        // the outer block did not continue
        assert!(engine.variable("Y", 0).is_err());
        assert_eq!(
            engine.variable("X", 0),
            Err(VariableError::NotFound { name: "X".to_owned() })
        );
    }

    #[test]
    fn goto_loop_faults_with_stack_overflow() {
        let mut engine = started("= START\nprint hi\n\n= LOOP\ngoto LOOP\n");
        assert_eq!(run(&mut engine, "goto LOOP"), FaultCode::StackOverflow.as_raw());
    }

    #[test]
    fn goto_repaints_the_scene_but_keeps_inventory() {
        let mut engine = started(
            "= START\nprint hall\nact Wave|print waved\nobj lamp\n\n= NEXT\nprint cellar\n",
        );
        assert_eq!(engine.actions().len(), 1);
        assert_eq!(engine.objects().len(), 1);
        assert_eq!(run(&mut engine, "goto NEXT"), 0);
        assert_eq!(engine.current_location(), Some("NEXT"));
        assert_eq!(engine.main_description(), "cellar\n");
        assert!(engine.actions().is_empty());
        assert_eq!(engine.objects().len(), 1, "objects survive location changes");
    }

    #[test]
    fn gosub_runs_in_place() {
        let mut engine = started("= START\nprint hall\n\n= HELPER\nX = 5\n");
        assert_eq!(run(&mut engine, "gosub HELPER"), 0);
        assert_eq!(engine.current_location(), Some("START"));
        assert_eq!(engine.variable("X", 0), Ok(Value::Int(5)));
        assert!(engine.main_description().contains("hall"));
    }

    #[test]
    fn missing_goto_target_faults_with_111() {
        let mut engine = started("= START\nprint hi\n");
        assert_eq!(run(&mut engine, "goto NOWHERE"), FaultCode::LocationNotFound.as_raw());
    }

    #[test]
    fn delact_and_delobj_drop_stale_selections() {
        let mut engine = started("= START\nact One|print 1\nact Two|print 2\nobj lamp\n");
        engine.set_selected_action(Some(1));
        engine.set_selected_object(Some(0));
        assert_eq!(run(&mut engine, "delact Two"), 0);
        assert_eq!(engine.actions().len(), 1);
        assert_eq!(engine.selected_action(), None);
        assert_eq!(run(&mut engine, "delobj lamp"), 0);
        assert!(engine.objects().is_empty());
        assert_eq!(engine.selected_object(), None);
    }

    #[test]
    fn malformed_menu_faults_with_122() {
        let mut engine = started("= START\nprint hi\n");
        assert_eq!(run(&mut engine, "menu NoTarget"), FaultCode::CantAddMenuItem.as_raw());
        assert!(engine.menu_items().is_empty());
    }

    #[test]
    fn menu_with_image_field_keeps_it() {
        let mut engine = started("= START\nprint hi\n");
        assert_eq!(run(&mut engine, "menu Map:ATLAS:map.png"), 0);
        assert_eq!(
            engine.menu_items(),
            &[MenuItem {
                label: "Map".to_owned(),
                image: Some("map.png".to_owned()),
                target: "ATLAS".to_owned(),
            }]
        );
    }

    #[test]
    fn show_and_hide_flip_window_flags() {
        let mut engine = started("= START\nprint hi\n");
        assert!(engine.window_visible(WindowKind::Objects));
        assert_eq!(run(&mut engine, "hide objects"), 0);
        assert!(!engine.window_visible(WindowKind::Objects));
        assert_eq!(run(&mut engine, "show objects"), 0);
        assert!(engine.window_visible(WindowKind::Objects));
        assert_eq!(run(&mut engine, "hide nonsense"), FaultCode::Syntax.as_raw());
    }

    #[test]
    fn roll_is_deterministic_and_in_range() {
        let mut first = started("= START\nprint hi\n");
        let mut second = started("= START\nprint hi\n");
        assert_eq!(run(&mut first, "roll D|6 & roll E|6"), 0);
        assert_eq!(run(&mut second, "roll D|6 & roll E|6"), 0);
        assert_eq!(first.variable("D", 0), second.variable("D", 0));
        assert_eq!(first.variable("E", 0), second.variable("E", 0));
        for name in ["D", "E"] {
            let Ok(Value::Int(n)) = first.variable(name, 0) else {
                panic!("roll did not store an integer");
            };
            assert!((1..=6).contains(&n));
        }
        assert_eq!(run(&mut first, "roll F|0"), FaultCode::Syntax.as_raw());
    }

    #[test]
    fn hooks_without_a_text_binding_are_no_ops() {
        let mut engine = started("= START\nprint hi\n");
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.run_hook(&mut ctx, "COUNTER");
        assert_eq!(ctx.state.last_error.code, 0);
        // an integer binding is not a location name
        engine.write_var("COUNTER".to_owned(), 0, Value::Int(3));
        engine.run_hook(&mut ctx, "COUNTER");
        assert_eq!(ctx.state.last_error.code, 0);
    }

    #[test]
    fn input_text_mirrors_into_user_text() {
        let mut engine = started("= START\nprint hi\n");
        engine.set_input_text("go north");
        assert_eq!(
            engine.variable("USER_TEXT", 0),
            Ok(Value::Text("go north".to_owned()))
        );
    }

    // --- status codec ---

    #[test]
    fn status_codec_round_trips_through_utf16() {
        let text = "{\"key\":\"π λ\"}";
        let encoded = encode_utf16_le(text);
        assert_eq!(encoded.len() % STATUS_UNIT_WIDTH, 0);
        let mut padded = encoded.clone();
        padded.extend_from_slice(&[0, 0]);
        assert_eq!(decode_utf16_le(&padded).unwrap(), text);
    }

    #[test]
    fn save_without_a_world_is_empty() {
        let mut engine = ScriptedEngine::new();
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        assert!(engine.save_status(&mut ctx).is_empty());
    }

    #[test]
    fn load_status_without_a_world_faults_with_106() {
        let mut engine = ScriptedEngine::new();
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.load_status(&mut ctx, &[0, 0]);
        assert_eq!(state.last_error.code, FaultCode::GameNotLoaded.as_raw());
    }

    #[test]
    fn load_status_rejects_garbage_with_105() {
        let mut engine = started("= START\nprint hi\n");
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        let mut garbage = encode_utf16_le("not json at all");
        garbage.extend_from_slice(&[0, 0]);
        engine.load_status(&mut ctx, &garbage);
        assert_eq!(state.last_error.code, FaultCode::CantLoadFile.as_raw());
    }

    // --- lifecycle ---

    #[test]
    fn reset_keeps_the_world_but_drops_game_state() {
        let mut engine = started("= START\nprint hi\nact Wave|print waved\n");
        assert_eq!(run(&mut engine, "X = 9 & hide input"), 0);
        engine.reset();
        assert_eq!(engine.current_location(), None);
        assert!(engine.actions().is_empty());
        assert!(engine.window_visible(WindowKind::Input));
        assert!(engine.variable("X", 0).is_err());
        // the world survives a reset, so a restart still works
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.restart(&mut ctx);
        assert_eq!(state.last_error.code, 0);
        assert_eq!(engine.current_location(), Some("START"));
    }

    #[test]
    fn clear_world_drops_everything() {
        let mut engine = started("= START\nprint hi\n");
        engine.clear_world();
        assert_eq!(engine.world_source(), None);
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.restart(&mut ctx);
        assert_eq!(state.last_error.code, FaultCode::GameNotLoaded.as_raw());
    }

    #[test]
    fn restart_without_a_world_faults_with_106() {
        let mut engine = ScriptedEngine::new();
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.restart(&mut ctx);
        assert_eq!(state.last_error.code, FaultCode::GameNotLoaded.as_raw());
    }

    #[test]
    fn execution_frame_tracks_location_and_line() {
        let mut engine = started("= START\nprint hi\n\n= BOOM\nX = 1\nY = 1 / 0\n");
        let mut state = SessionState::new(true);
        let mut table = CallbackTable::new();
        let mut ctx = EngineCtx {
            state: &mut state,
            callbacks: &mut table,
        };
        engine.run_location(&mut ctx, "BOOM", &[]);
        assert_eq!(state.last_error.code, FaultCode::DivisionByZero.as_raw());
        assert_eq!(state.last_error.location.as_deref(), Some("BOOM"));
        assert_eq!(state.last_error.line, 2);
        // outside a run the frame is idle again
        assert_eq!(engine.execution_location(), None);
        assert_eq!(engine.execution_line(), 0);
    }
}
