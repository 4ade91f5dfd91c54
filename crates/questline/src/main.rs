//! `ql` - terminal host for the questline interpreter.
//!
//! Wraps a [`questline_core::Session`] around the built-in scripted engine
//! and drives it from stdin: world text in, rendered scene out. The second
//! subcommand, `check`, loads a world file without running it, for use in
//! authoring pipelines.

mod player;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use questline_core::logging::init_logging;
use questline_core::{
    CallbackTable, HostConfig, ScriptedEngine, Session, SessionConfig, describe,
};

#[derive(Parser)]
#[command(name = "ql")]
#[command(about = "Terminal player and validator for quest world files")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "QL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level filter override (trace, debug, info, warn, error)
    #[arg(long, env = "QL_LOG", global = true)]
    log_level: Option<String>,

    /// Log output format override (text or json)
    #[arg(long, env = "QL_LOG_FORMAT", global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a world file interactively
    #[command(after_help = "\
Typed lines go to the world's input handler; a bare number runs that
action. Host commands start with a colon; :help lists them.

Examples:
  ql play castle.ql
  ql play castle.ql --save-dir ~/saves
  ql --log-level debug play castle.ql")]
    Play {
        /// World file to load
        world: PathBuf,

        /// Directory for save files
        #[arg(long, default_value = ".")]
        save_dir: PathBuf,

        /// Start with the engine's debug output enabled
        #[arg(long)]
        debug: bool,
    },

    /// Load a world file and report whether it is playable
    #[command(after_help = "\
Exit codes:
  0  world loads
  1  world rejected
  2  usage error

Run with --log-level debug to see why a world was rejected.

Examples:
  ql check castle.ql
  ql check castle.ql --json")]
    Check {
        /// World file to validate
        world: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => HostConfig::load_from(path)?,
        None => HostConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }
    init_logging(&config.log)?;

    match cli.command {
        Commands::Play {
            world,
            save_dir,
            debug,
        } => {
            if debug {
                config.session.debug = true;
            }
            player::run(&world, &save_dir, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { world, json } => check_world(&world, json),
    }
}

/// Outcome of `ql check`, printed as one line or as JSON.
#[derive(Serialize)]
struct CheckReport {
    ok: bool,
    source: String,
    interpreter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

/// Loads `path` into a throwaway session with no callbacks installed and
/// reports the result. Nothing from the world is executed.
fn check_world(path: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut session = Session::new(
        Box::new(ScriptedEngine::new()),
        CallbackTable::new(),
        &SessionConfig::default(),
    );
    let source = path.display().to_string();
    let loaded = session.load_world_from_buffer(&bytes, &source).is_ok();
    let fault = session.snapshot().last_error();

    let report = CheckReport {
        ok: loaded,
        interpreter: session.snapshot().interpreter_version(),
        source,
        code: (!loaded).then_some(fault.code),
        error: (!loaded).then(|| describe(fault.code)),
    };
    session.terminate();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.ok {
        println!("ok: {}", report.source);
    } else {
        println!(
            "rejected: {} ({} code {})",
            report.source,
            report.error.unwrap_or_default(),
            fault.code
        );
    }
    Ok(if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
