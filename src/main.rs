//! PangShell entry point.
//!
//! Usage:
//!   pangsh                   # interactive shell
//!   pangsh -c <line>         # run one line and exit
//!   pangsh script.psh        # run a script and exit
//!   pangsh --vars <json>     # start with the given variables (used by `rl`)

use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use pangsh::editor::LineEditor;
use pangsh::env::SHELL_DIR;
use pangsh::platform::CrosstermTerminal;
use pangsh::{Environment, Interpreter, interrupt};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_STARTUP: &str = include_str!("startup.psh");

#[derive(FromArgs)]
/// An interactive shell with typed variables.
struct Cli {
    /// run one line and exit
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// skip the startup script
    #[argh(switch)]
    no_startup: bool,

    /// script to run line by line
    #[argh(positional)]
    script: Option<PathBuf>,
}

/// Removes `--vars <json>` from `args`, returning the json if present.
fn strip_vars_argument(args: Vec<String>) -> (Vec<String>, Option<String>) {
    let mut rest = Vec::with_capacity(args.len());
    let mut vars = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--vars" {
            vars = args.next();
        } else if let Some(json) = arg.strip_prefix("--vars=") {
            vars = Some(json.to_string());
        } else {
            rest.push(arg);
        }
    }
    (rest, vars)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("PANGSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run_startup(sh: &mut Interpreter) -> Result<()> {
    let custom = sh
        .env()
        .get_text(SHELL_DIR)
        .map(|dir| PathBuf::from(dir).join("startup.psh"))
        .filter(|path| path.is_file());

    let source = match custom {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("cannot read startup script '{}'", path.display()))?,
        None => DEFAULT_STARTUP.to_string(),
    };
    sh.run_script_source(&source);
    Ok(())
}

fn run() -> Result<ExitCode> {
    let (args, vars) = strip_vars_argument(std::env::args().collect());
    let (program, launch_args) = match args.split_first() {
        Some((program, rest)) => (program.clone(), rest.to_vec()),
        None => ("pangsh".to_string(), Vec::new()),
    };

    let strs: Vec<&str> = launch_args.iter().map(String::as_str).collect();
    let cli = match Cli::from_args(&[program.as_str()], &strs) {
        Ok(cli) => cli,
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => {
            println!("{output}");
            return Ok(ExitCode::SUCCESS);
        }
        Err(EarlyExit {
            output,
            status: Err(()),
        }) => {
            eprintln!("{output}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let env = match vars {
        Some(json) => Environment::from_serialized(&json).context("--vars is not a JSON object of values")?,
        None => Environment::new(),
    };

    if let Err(e) = interrupt::install() {
        tracing::warn!(error = %e, "Ctrl+C handler not installed");
    }

    let mut sh = Interpreter::new(env).with_launch_args(launch_args);
    if !cli.no_startup {
        run_startup(&mut sh)?;
    }

    if let Some(line) = cli.command {
        return Ok(match sh.run_line(&line) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                sh.report_error(&err);
                ExitCode::FAILURE
            }
        });
    }

    if let Some(script) = cli.script {
        let source = fs::read_to_string(&script)
            .with_context(|| format!("cannot read script '{}'", script.display()))?;
        sh.run_script_source(&source);
        return Ok(ExitCode::SUCCESS);
    }

    let mut terminal = CrosstermTerminal;
    let mut editor = LineEditor::new();
    sh.repl(&mut editor, &mut terminal)
        .context("terminal input failed")?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}
