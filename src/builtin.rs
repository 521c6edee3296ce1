use crate::env::{Environment, VERSION};
use crate::error::ShellError;
use crate::interrupt::InterruptState;
use crate::io_adapters::OutputSink;
use crate::keyword::Keyword;
use crate::listing;
use crate::platform::{Console, SystemInfo};
use crate::style::{self, GRADIENT_BOTTOM, GRADIENT_TOP, Uptime};
use crate::value::Value;
use argh::{EarlyExit, FromArgValue, FromArgs};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

const DEFAULT_LOGO: &str = include_str!("logo.txt");

/// Everything a built-in may touch while it runs.
pub struct Context<'a> {
    pub env: &'a mut Environment,
    pub out: &'a mut OutputSink,
    pub console: &'a mut dyn Console,
    pub system: &'a dyn SystemInfo,
    pub interrupts: &'a InterruptState,
    /// Command line the shell was started with, minus `--vars`.
    pub launch_args: &'a [String],
}

impl Context<'_> {
    /// `path` relative to the shell's working directory.
    fn resolve(&self, path: &str) -> PathBuf {
        self.env.current_dir.join(path)
    }

    fn display_path(&self, path: &Path) -> String {
        style::format_path(path, self.env.home_dir().as_deref())
    }
}

/// Built-ins whose arguments are a list of words, parsed with [`argh`].
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "ls".
    fn name() -> &'static str;

    fn execute(self, ctx: &mut Context<'_>) -> Result<(), ShellError>;
}

/// Parses `args` as `T` and runs it. `--help` prints usage instead.
fn run_with_args<T: BuiltinCommand>(args: &[String], ctx: &mut Context<'_>) -> Result<(), ShellError> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[T::name()], &args) {
        Ok(cmd) => cmd.execute(ctx),
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => {
            write!(ctx.out, "{output}")?;
            Ok(())
        }
        Err(EarlyExit {
            output,
            status: Err(()),
        }) => Err(ShellError::InvalidArgument(output.trim_end().to_string())),
    }
}

/// Runs a built-in that takes a list of words.
pub fn run_list(keyword: Keyword, args: &[String], ctx: &mut Context<'_>) -> Result<(), ShellError> {
    match keyword {
        Keyword::List => run_with_args::<Ls>(args, ctx),
        Keyword::Remove => run_with_args::<Rm>(&expand_short_flags(args), ctx),
        Keyword::EchoToggle => run_with_args::<EchoToggle>(args, ctx),
        other => Err(ShellError::InvalidArgument(format!(
            "'{other}' does not take a list of arguments"
        ))),
    }
}

/// Runs a built-in that takes the value of one expression.
pub fn run_scalar(keyword: Keyword, value: Value, ctx: &mut Context<'_>) -> Result<(), ShellError> {
    match keyword {
        Keyword::Echo => {
            writeln!(ctx.out, "{value}")?;
            Ok(())
        }
        Keyword::Cd => change_directory(&value.to_string(), ctx),
        Keyword::Touch => touch(&value.to_string(), ctx),
        Keyword::Type => type_file(&value.to_string(), ctx),
        Keyword::Title => Ok(ctx.console.set_title(&value.to_string())?),
        Keyword::Delete => {
            let name = value.to_string();
            ctx.env
                .remove_var(&name)
                .map(drop)
                .ok_or(ShellError::UndefinedVariable(name))
        }
        other => Err(ShellError::InvalidArgument(format!(
            "'{other}' does not take an expression"
        ))),
    }
}

/// Runs a built-in that takes no arguments.
pub fn run_bare(keyword: Keyword, ctx: &mut Context<'_>) -> Result<(), ShellError> {
    match keyword {
        Keyword::Cls => Ok(ctx.console.clear_screen()?),
        Keyword::Uptime => {
            let uptime = Uptime::from(ctx.system.uptime()?);
            writeln!(ctx.out, "{uptime}")?;
            Ok(())
        }
        Keyword::Neofetch => neofetch(ctx),
        Keyword::Exit => {
            ctx.env.should_exit = true;
            Ok(())
        }
        Keyword::Reload => reload(ctx),
        other => Err(ShellError::InvalidArgument(format!(
            "'{other}' requires arguments"
        ))),
    }
}

fn change_directory(target: &str, ctx: &mut Context<'_>) -> Result<(), ShellError> {
    let new_dir = if target.is_empty() {
        ctx.env
            .home_dir()
            .ok_or_else(|| ShellError::InvalidArgument("cd: HOME is not set".to_string()))?
    } else {
        ctx.resolve(target)
    };

    let canonical =
        fs::canonicalize(&new_dir).map_err(|_| ShellError::PathNotFound(PathBuf::from(target)))?;
    if !canonical.is_dir() {
        return Err(ShellError::NotADirectory(PathBuf::from(target)));
    }
    std::env::set_current_dir(&canonical)
        .map_err(|_| ShellError::PathNotFound(PathBuf::from(target)))?;
    tracing::debug!(dir = %canonical.display(), "changed directory");
    ctx.env.current_dir = canonical;
    Ok(())
}

fn touch(target: &str, ctx: &mut Context<'_>) -> Result<(), ShellError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(ctx.resolve(target))
        .map(drop)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ShellError::AlreadyExists(PathBuf::from(target)),
            _ => ShellError::Io(e),
        })
}

fn type_file(target: &str, ctx: &mut Context<'_>) -> Result<(), ShellError> {
    let contents = fs::read_to_string(ctx.resolve(target)).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ShellError::FileNotFound(PathBuf::from(target)),
        _ => ShellError::Io(e),
    })?;
    write!(ctx.out, "{contents}")?;
    if !contents.ends_with('\n') {
        writeln!(ctx.out)?;
    }
    Ok(())
}

fn neofetch(ctx: &mut Context<'_>) -> Result<(), ShellError> {
    let logo = ctx
        .env
        .get_text("LOGO")
        .and_then(|path| fs::read_to_string(ctx.resolve(&path)).ok())
        .unwrap_or_else(|| DEFAULT_LOGO.to_string());
    let logo: Vec<&str> = logo.lines().collect();
    let width = logo.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let uptime = ctx.system.uptime().map(Uptime::from);
    let mut info = vec![
        format!("OS: {}", ctx.system.os_name()),
        format!("Host: {}", ctx.system.hostname()),
    ];
    match uptime {
        Ok(u) => {
            info.push(format!(
                "Uptime: {} days, {} hours, {} minutes",
                u.days, u.hours, u.mins
            ));
            info.push(format!("and {} seconds", u.secs));
        }
        Err(_) => info.push("Uptime: unknown".to_string()),
    }
    info.push(format!(
        "Shell: PangShell {}",
        ctx.env.get_text(VERSION).unwrap_or_default()
    ));
    if let Some((columns, rows)) = ctx.console.size() {
        info.push(format!("Terminal: {columns}x{rows}"));
    }

    let rows = logo.len().max(info.len());
    let lines: Vec<String> = (0..rows)
        .map(|i| {
            let art = logo.get(i).copied().unwrap_or("");
            let text = info.get(i).map(String::as_str).unwrap_or("");
            let pad = width - art.chars().count();
            format!("{art}{:pad$} {text}", "")
        })
        .collect();

    let painted = style::gradient(&lines, GRADIENT_TOP, GRADIENT_BOTTOM);
    write!(ctx.out, "\n{}\n\n", painted.join("\n"))?;
    Ok(())
}

/// The command that restarts the shell with `vars` carried over.
fn reload_command(exe: &Path, launch_args: &[String], vars: &str) -> Command {
    let mut command = Command::new(exe);
    command.args(launch_args).arg("--vars").arg(vars);
    command
}

fn reload(ctx: &mut Context<'_>) -> Result<(), ShellError> {
    let vars = ctx
        .env
        .to_serialized()
        .map_err(|e| ShellError::InvalidArgument(format!("cannot save variables: {e}")))?;
    let exe = std::env::current_exe()?;
    let mut command = reload_command(&exe, ctx.launch_args, &vars);
    command.current_dir(&ctx.env.current_dir);
    ctx.out.flush()?;
    tracing::info!(exe = %exe.display(), "reloading shell");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Only returns on failure.
        Err(command.exec().into())
    }

    #[cfg(not(unix))]
    {
        command.status()?;
        ctx.env.should_exit = true;
        Ok(())
    }
}

/// Splits combined short switches: `-rf` becomes `-r -f`.
fn expand_short_flags(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| {
            let letters = arg.strip_prefix('-').filter(|rest| {
                rest.len() > 1 && !rest.starts_with('-') && rest.chars().all(|c| c.is_ascii_alphabetic())
            });
            match letters {
                Some(letters) => letters.chars().map(|c| format!("-{c}")).collect(),
                None => vec![arg.clone()],
            }
        })
        .collect()
}

#[derive(FromArgs)]
/// List the entries of a directory.
pub struct Ls {
    #[argh(option, short = 'O')]
    /// only show entries whose name ends with this text
    pub only: Option<String>,

    #[argh(positional)]
    /// directory to list; the current directory when omitted
    pub path: Option<String>,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<(), ShellError> {
        let dir = match &self.path {
            Some(p) => ctx.resolve(p),
            None => ctx.env.current_dir.clone(),
        };
        let listing = listing::list_directory(&dir, self.only.as_deref()).map_err(|e| {
            match e.kind() {
                io::ErrorKind::NotFound => ShellError::PathNotFound(dir.clone()),
                _ => ShellError::Io(e),
            }
        })?;
        let title = ctx.display_path(&dir);
        write!(ctx.out, "{}", listing.render(&title))?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Remove a file, or a whole directory tree with -r.
pub struct Rm {
    #[argh(switch, short = 'f')]
    /// do not ask for confirmation
    pub force: bool,

    #[argh(switch, short = 'r')]
    /// remove a directory and everything below it
    pub recursive: bool,

    #[argh(positional)]
    /// what to remove; the current directory when omitted
    pub path: Option<String>,
}

impl BuiltinCommand for Rm {
    fn name() -> &'static str {
        "rm"
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<(), ShellError> {
        let path = match &self.path {
            Some(p) => ctx.resolve(p),
            None => ctx.env.current_dir.clone(),
        };

        if !self.force {
            let prompt = format!(
                "You are about to remove '{}', are you sure [Y/N]? ",
                ctx.display_path(&path)
            );
            if !ctx.console.confirm(&prompt)? {
                return Ok(());
            }
        }

        if self.recursive {
            remove_tree(&path, ctx)
        } else {
            if !path.is_file() {
                return Err(ShellError::FileNotFound(path));
            }
            Ok(fs::remove_file(&path)?)
        }
    }
}

/// Removes `dir` depth first, reporting each file on one overwritten line.
fn remove_tree(dir: &Path, ctx: &mut Context<'_>) -> Result<(), ShellError> {
    if !dir.is_dir() {
        return Err(ShellError::NotADirectory(dir.to_path_buf()));
    }

    for entry in fs::read_dir(dir)? {
        ctx.interrupts.check()?;
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            remove_tree(&path, ctx)?;
        } else {
            let progress = format!("Removing '{}'.", entry.file_name().to_string_lossy());
            write!(ctx.out, "{progress}\r")?;
            ctx.out.flush()?;
            fs::remove_file(&path)?;
            write!(ctx.out, "{:width$}\r", "", width = progress.chars().count())?;
        }
    }
    fs::remove_dir(dir)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoState {
    On,
    Off,
}

impl FromArgValue for EchoState {
    fn from_arg_value(value: &str) -> Result<Self, String> {
        match value {
            "on" => Ok(EchoState::On),
            "off" => Ok(EchoState::Off),
            other => Err(format!("expected 'on' or 'off', found '{other}'")),
        }
    }
}

#[derive(FromArgs)]
/// Turn output of built-in commands on or off.
pub struct EchoToggle {
    #[argh(positional)]
    /// on or off
    pub state: EchoState,
}

impl BuiltinCommand for EchoToggle {
    fn name() -> &'static str {
        "@echo"
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<(), ShellError> {
        let enabled = self.state == EchoState::On;
        if ctx.out.is_enabled() != enabled {
            tracing::debug!(enabled, "built-in output toggled");
        }
        ctx.out.set_enabled(enabled);
        Ok(())
    }
}
