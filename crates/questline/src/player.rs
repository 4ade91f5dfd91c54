//! Interactive terminal player.
//!
//! The renderer is the view-refresh callback handler: every guarded call
//! made with `refresh = true` ends with the bridge asking the host to
//! repaint, exactly as a windowed player would be asked. Panes are
//! reprinted only when the engine's per-run changed flags say they moved,
//! and the main description pane prints just its new tail when text was
//! appended rather than replaced.
//!
//! Typed lines go to the world's input handler; a bare number runs that
//! action; lines starting with `:` are host commands handled here.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, info, warn};

use questline_core::{
    Callback, CallbackTable, GuardedError, HostConfig, ScriptedEngine, SelectError,
    SerializeError, Session, Snapshot, WindowKind, describe,
};

/// Paths the callback handlers resolve against. `quest_dir` follows the
/// loaded world via the quest-path callback; `save_dir` is fixed at startup.
struct HostPaths {
    quest_dir: PathBuf,
    save_dir: PathBuf,
}

impl HostPaths {
    /// An empty name gets a timestamped file; relative names land in the
    /// save directory; absolute names are used as given.
    fn resolve_save(&self, name: &str) -> PathBuf {
        if name.is_empty() {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            return self.save_dir.join(format!("save-{stamp}.qsav"));
        }
        let named = Path::new(name);
        if named.is_absolute() {
            named.to_path_buf()
        } else {
            self.save_dir.join(named)
        }
    }

    /// Most recently written save file, for restoring without a name.
    fn latest_save(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.save_dir).ok()?;
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "qsav"))
            .max_by_key(|path| std::fs::metadata(path).and_then(|meta| meta.modified()).ok())
    }
}

/// What the command loop should do after one line of input.
enum Command {
    Quit,
    Handled,
    Ran(Result<(), GuardedError>),
}

/// Loads `world_path` and drives the session until quit, halt, or EOF.
pub fn run(world_path: &Path, save_dir: &Path, config: &HostConfig) -> anyhow::Result<()> {
    let bytes = std::fs::read(world_path)
        .with_context(|| format!("reading world file {}", world_path.display()))?;
    std::fs::create_dir_all(save_dir)
        .with_context(|| format!("creating save directory {}", save_dir.display()))?;

    let quest_dir = world_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let paths = Rc::new(RefCell::new(HostPaths {
        quest_dir,
        save_dir: save_dir.to_path_buf(),
    }));
    let main_seen = Rc::new(RefCell::new(String::new()));

    let callbacks = build_callbacks(&paths, &main_seen);
    let mut session = Session::new(Box::new(ScriptedEngine::new()), callbacks, &config.session);

    if session
        .load_world_from_buffer(&bytes, &world_path.display().to_string())
        .is_err()
    {
        let report = session.snapshot().last_error();
        anyhow::bail!(
            "world rejected: {} (code {}); run ql check with --log-level debug for the reason",
            describe(report.code),
            report.code
        );
    }
    info!(world = %world_path.display(), "game starting");

    let strict = config.session.exit_on_error;
    if let Err(err) = session.restart(true) {
        return Err(fault_error(&session.snapshot(), &err));
    }

    loop {
        let Some(line) = prompt_line("\n> ") else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let command = if let Some(rest) = trimmed.strip_prefix(':') {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let verb = parts.next().unwrap_or("");
            let arg = parts.next().unwrap_or("").trim();
            host_command(&mut session, &paths, &main_seen, verb, arg)
        } else if let Ok(number) = trimmed.parse::<usize>() {
            pick_action(&mut session, number)
        } else {
            session.set_input_text(trimmed);
            Command::Ran(session.exec_user_input(true))
        };

        match command {
            Command::Quit => break,
            Command::Handled => {}
            Command::Ran(result) => {
                // One scheduler tick per processed command, standing in for
                // a windowed host's timer.
                let outcome = result.and_then(|()| session.exec_counter(true));
                if let Err(err) = outcome {
                    if !report_failure(&session.snapshot(), &err, strict)? {
                        break;
                    }
                }
            }
        }
    }

    session.terminate();
    info!("session closed");
    Ok(())
}

/// Handles a `:`-prefixed host command.
fn host_command(
    session: &mut Session,
    paths: &Rc<RefCell<HostPaths>>,
    main_seen: &Rc<RefCell<String>>,
    verb: &str,
    arg: &str,
) -> Command {
    match verb {
        "q" | "quit" => Command::Quit,
        "help" => {
            print_help();
            Command::Handled
        }
        "look" => {
            render(&session.snapshot(), &mut main_seen.borrow_mut(), true);
            Command::Handled
        }
        "restart" => Command::Ran(session.restart(true)),
        "save" => {
            let path = paths.borrow().resolve_save(arg);
            match session.save_to_buffer() {
                Ok(bytes) => match std::fs::write(&path, &bytes) {
                    Ok(()) => println!("(saved to {})", path.display()),
                    Err(err) => eprintln!("save failed: {err}"),
                },
                Err(SerializeError::Guard(err)) => return Command::Ran(Err(err)),
                Err(err) => eprintln!("save failed: {err}"),
            }
            Command::Handled
        }
        "load" => {
            let path = if arg.is_empty() {
                match paths.borrow().latest_save() {
                    Some(path) => path,
                    None => {
                        println!("(no save files yet)");
                        return Command::Handled;
                    }
                }
            } else {
                paths.borrow().resolve_save(arg)
            };
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    eprintln!("cannot read {}: {err}", path.display());
                    return Command::Handled;
                }
            };
            match session.load_from_buffer(&bytes, true) {
                Ok(()) => Command::Handled,
                Err(SerializeError::Guard(err)) => Command::Ran(Err(err)),
                Err(err) => {
                    eprintln!("restore failed: {err}");
                    Command::Handled
                }
            }
        }
        "obj" => {
            let Ok(number) = arg.parse::<usize>() else {
                println!("(usage: :obj N)");
                return Command::Handled;
            };
            let Some(index) = number.checked_sub(1) else {
                println!("(objects are numbered from 1)");
                return Command::Handled;
            };
            match session.set_selected_object(index, true) {
                Ok(()) => Command::Ran(Ok(())),
                Err(SelectError::OutOfRange { count, .. }) => {
                    if count == 0 {
                        println!("(you are carrying nothing)");
                    } else {
                        println!("(pick an object between 1 and {count})");
                    }
                    Command::Handled
                }
                Err(SelectError::Guard(err)) => Command::Ran(Err(err)),
            }
        }
        "var" => {
            if arg.is_empty() {
                println!("(usage: :var NAME)");
                return Command::Handled;
            }
            let snap = session.snapshot();
            match snap.variable_values_count(arg) {
                Ok(count) => {
                    for index in 0..count {
                        if let Ok(value) = snap.variable_value(arg, index) {
                            println!("  {}[{index}] = {value}", arg.to_uppercase());
                        }
                    }
                }
                Err(err) => println!("  {err}"),
            }
            Command::Handled
        }
        "debug" => {
            match arg {
                "on" => session.set_debug(true),
                "off" => session.set_debug(false),
                _ => {
                    println!("(usage: :debug on|off)");
                    return Command::Handled;
                }
            }
            println!("(debug output {arg})");
            Command::Handled
        }
        _ => {
            println!("(unknown command :{verb}; :help lists commands)");
            Command::Handled
        }
    }
}

/// Selects and runs action `number` (1-based, as rendered).
fn pick_action(session: &mut Session, number: usize) -> Command {
    let Some(index) = number.checked_sub(1) else {
        println!("(actions are numbered from 1)");
        return Command::Handled;
    };
    match session.set_selected_action(index, false) {
        Ok(()) => Command::Ran(session.execute_selected_action(true)),
        Err(SelectError::OutOfRange { count, .. }) => {
            if count == 0 {
                println!("(no actions here)");
            } else {
                println!("(pick an action between 1 and {count})");
            }
            Command::Handled
        }
        Err(SelectError::Guard(err)) => Command::Ran(Err(err)),
    }
}

fn print_help() {
    println!("  :help            this list");
    println!("  :look            repaint the whole scene");
    println!("  :restart         restart the game from the entry location");
    println!("  :save [NAME]     save (timestamped file when no name given)");
    println!("  :load [NAME]     restore (latest save when no name given)");
    println!("  :obj N           select carried object N");
    println!("  :var NAME        show a world variable");
    println!("  :debug on|off    toggle the world's debug output");
    println!("  :quit            leave the game");
    println!("  NUMBER           run that action");
    println!("  anything else    send the line to the world");
}

/// Builds the callback table for terminal play. Every host service the
/// engine can request is wired up except incremental menu-row insertion,
/// which this host does not need: the menu handler reads the finished rows
/// from a snapshot instead.
fn build_callbacks(
    paths: &Rc<RefCell<HostPaths>>,
    main_seen: &Rc<RefCell<String>>,
) -> CallbackTable {
    let started_at = Instant::now();
    let mut table = CallbackTable::new();

    table.register(Callback::Debug(Box::new(|_, text| {
        eprintln!("[debug] {text}");
    })));

    table.register(Callback::RefreshInt(Box::new({
        let main_seen = Rc::clone(main_seen);
        move |ctx| {
            render(&ctx.snapshot(), &mut main_seen.borrow_mut(), false);
        }
    })));

    table.register(Callback::ShowImage(Box::new(|_, file| {
        println!("[illustration: {file}]");
    })));

    table.register(Callback::ShowMessage(Box::new(|_, text| {
        println!("*** {text} ***");
    })));

    table.register(Callback::ShowWindow(Box::new(|_, kind, visible| {
        debug!(%kind, visible, "pane visibility changed");
    })));

    // Draw the rows, read a 1-based choice, and select it while the script
    // that opened the menu is still suspended underneath us.
    table.register(Callback::ShowMenu(Box::new(|ctx| {
        let items = ctx.snapshot().menu_items();
        if items.is_empty() {
            return;
        }
        println!();
        for (i, item) in items.iter().enumerate() {
            println!("  {}) {}", i + 1, item.label);
        }
        let Some(line) = prompt_line("menu> ") else {
            return;
        };
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=items.len()).contains(&n) => {
                if let Err(err) = ctx.select_menu_item(n - 1) {
                    warn!(%err, "menu selection failed");
                }
            }
            _ => println!("(menu dismissed)"),
        }
    })));

    table.register(Callback::PlayFile(Box::new(|_, file, volume| {
        debug!(file, volume, "audio start requested");
    })));
    table.register(Callback::IsPlayingFile(Box::new(|_, _| false)));
    table.register(Callback::CloseFile(Box::new(|_, file| {
        debug!(file, "audio stop requested");
    })));

    // Saving and restoring re-enter the session from inside the callback;
    // the bridge runs its usual guard for the nested call.
    table.register(Callback::SaveGameStatus(Box::new({
        let paths = Rc::clone(paths);
        move |ctx, name| {
            let path = paths.borrow().resolve_save(name);
            match ctx.save_to_buffer() {
                Ok(bytes) => match std::fs::write(&path, &bytes) {
                    Ok(()) => println!("(saved to {})", path.display()),
                    Err(err) => warn!(path = %path.display(), %err, "save write failed"),
                },
                Err(err) => warn!(%err, "state save failed"),
            }
        }
    })));
    table.register(Callback::OpenGameStatus(Box::new({
        let paths = Rc::clone(paths);
        move |ctx, name| {
            let path = if name.is_empty() {
                paths.borrow().latest_save()
            } else {
                Some(paths.borrow().resolve_save(name))
            };
            let Some(path) = path else {
                warn!("no save file to restore");
                return;
            };
            match std::fs::read(&path) {
                Ok(bytes) => {
                    if let Err(err) = ctx.load_from_buffer(&bytes, true) {
                        warn!(%err, "state restore failed");
                    }
                }
                Err(err) => warn!(path = %path.display(), %err, "save file unreadable"),
            }
        }
    })));

    table.register(Callback::InputBox(Box::new(|_, prompt| {
        let shown = if prompt.is_empty() { "?" } else { prompt };
        prompt_line(&format!("{shown} ")).unwrap_or_default()
    })));

    table.register(Callback::SetTimer(Box::new(|_, interval_ms| {
        debug!(interval_ms, "tick interval requested");
    })));

    table.register(Callback::GetMsCount(Box::new(move |_| {
        u32::try_from(started_at.elapsed().as_millis()).unwrap_or(u32::MAX)
    })));

    table.register(Callback::Sleep(Box::new(|_, duration_ms| {
        std::thread::sleep(Duration::from_millis(u64::from(duration_ms)));
    })));

    table.register(Callback::GetFileContent(Box::new({
        let paths = Rc::clone(paths);
        move |_, file| {
            let path = paths.borrow().quest_dir.join(file);
            std::fs::read(&path).unwrap_or_default()
        }
    })));

    table.register(Callback::ChangeQuestPath(Box::new({
        let paths = Rc::clone(paths);
        move |_, dir| {
            debug!(dir, "quest path changed");
            paths.borrow_mut().quest_dir = PathBuf::from(dir);
        }
    })));

    table
}

/// Repaints the panes whose content moved during the last run; `force`
/// repaints everything. `main_seen` remembers what the main pane already
/// shows so appended text prints as just its new tail.
fn render(snap: &Snapshot<'_>, main_seen: &mut String, force: bool) {
    if force || snap.main_description_changed() {
        let text = snap.main_description();
        if force || !text.starts_with(main_seen.as_str()) {
            let full = text.trim_end();
            if !full.is_empty() {
                println!("{full}");
            }
        } else {
            let tail = text[main_seen.len()..].trim_end();
            if !tail.is_empty() {
                println!("{tail}");
            }
        }
        *main_seen = text;
    }

    if (force || snap.extra_description_changed()) && snap.window_visible(WindowKind::Variables) {
        let text = snap.extra_description();
        let text = text.trim_end();
        if !text.is_empty() {
            println!("[{text}]");
        }
    }

    if (force || snap.actions_changed()) && snap.window_visible(WindowKind::Actions) {
        let actions = snap.actions();
        if !actions.is_empty() {
            println!();
            for (i, entry) in actions.iter().enumerate() {
                println!("  {}) {}", i + 1, entry.description);
            }
        }
    }

    if (force || snap.objects_changed()) && snap.window_visible(WindowKind::Objects) {
        let objects = snap.objects();
        if !objects.is_empty() {
            println!();
            println!("You are carrying:");
            for entry in &objects {
                println!("  - {}", entry.description);
            }
        }
    }
}

/// Prints `prompt`, flushes, and reads one line. `None` when stdin closed.
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
    }
}

/// Prints a failed guarded call. `Ok(false)` stops the loop cleanly, `Err`
/// exits the player with a failure; in strict mode a script fault is fatal
/// because the latched report rejects every further call.
fn report_failure(
    snap: &Snapshot<'_>,
    err: &GuardedError,
    strict: bool,
) -> anyhow::Result<bool> {
    match err {
        GuardedError::ExecutionDisabled => {
            println!("(the game has ended)");
            Ok(false)
        }
        GuardedError::RuntimeFault { code } if !strict => {
            let report = snap.last_error();
            match report.location {
                Some(ref location) => eprintln!(
                    "script fault at {location}, line {}: {} (code {code})",
                    report.line,
                    describe(*code)
                ),
                None => eprintln!("script fault: {} (code {code})", describe(*code)),
            }
            Ok(true)
        }
        _ => Err(fault_error(snap, err)),
    }
}

/// A guarded-call failure as a terminal error for `main` to print.
fn fault_error(snap: &Snapshot<'_>, err: &GuardedError) -> anyhow::Error {
    match err {
        GuardedError::RuntimeFault { code } => {
            let report = snap.last_error();
            match report.location {
                Some(ref location) => anyhow::anyhow!(
                    "script fault at {location}, line {}: {} (code {code})",
                    report.line,
                    describe(*code)
                ),
                None => anyhow::anyhow!("script fault: {} (code {code})", describe(*code)),
            }
        }
        other => anyhow::anyhow!("{other}"),
    }
}
