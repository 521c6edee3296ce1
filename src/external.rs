use crate::error::ShellError;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Why a launch attempt did not produce an exit status.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Nothing runnable under this name; the caller may try another spelling.
    #[error("program not found")]
    NotFound,
    #[error(transparent)]
    Failed(#[from] io::Error),
}

/// What a launched program inherits from the shell.
#[derive(Debug, Clone, Copy)]
pub struct LaunchEnv<'a> {
    pub vars: &'a [(String, String)],
    pub current_dir: &'a Path,
}

impl LaunchEnv<'_> {
    fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Starts external programs and waits for them.
pub trait Launcher {
    /// Runs `argv` to completion and returns its exit code.
    fn launch(&mut self, argv: &[String], env: &LaunchEnv<'_>) -> Result<i32, LaunchError>;
}

/// Launches through `std::process`, resolving the program with the shell's `PATH`.
#[derive(Debug, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&mut self, argv: &[String], env: &LaunchEnv<'_>) -> Result<i32, LaunchError> {
        let (program, args) = argv.split_first().ok_or(LaunchError::NotFound)?;
        let search_paths = env.var("PATH").unwrap_or_default();
        let executable = find_command_path(OsStr::new(search_paths), Path::new(program))
            .ok_or(LaunchError::NotFound)?;

        let status = Command::new(&*executable)
            .args(args)
            .env_clear()
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(env.current_dir)
            .status()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => LaunchError::NotFound,
                _ => LaunchError::Failed(e),
            })?;

        Ok(match status.code() {
            Some(x) => x,
            None => terminated_by_signal(status),
        })
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// How a program name is retried when it cannot be launched as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Suffixes tried after the verbatim name.
    pub extensions: Vec<String>,
    /// Directory of system binaries tried last.
    pub system_dir: Option<PathBuf>,
    /// Program that runs an elevated command when the shell cannot raise
    /// its own privileges.
    pub elevation_wrapper: Option<String>,
}

impl DispatchPolicy {
    /// No retries: the name is launched verbatim or not at all.
    pub fn verbatim() -> Self {
        Self {
            extensions: Vec::new(),
            system_dir: None,
            elevation_wrapper: None,
        }
    }

    #[cfg(windows)]
    pub fn native() -> Self {
        Self {
            extensions: [".bat", ".exe", ".com"].map(String::from).to_vec(),
            system_dir: std::env::var_os("WINDIR").map(|dir| PathBuf::from(dir).join("System32")),
            elevation_wrapper: None,
        }
    }

    #[cfg(not(windows))]
    pub fn native() -> Self {
        Self {
            elevation_wrapper: Some("sudo".to_string()),
            ..Self::verbatim()
        }
    }

    /// Every spelling of `program` to try, in order.
    fn candidates(&self, program: &str) -> Vec<String> {
        let with_extensions = |name: &str| {
            let mut names = vec![name.to_string()];
            names.extend(self.extensions.iter().map(|ext| format!("{name}{ext}")));
            names
        };

        let mut names = with_extensions(program);
        if let Some(dir) = &self.system_dir {
            if !Path::new(program).starts_with(dir) {
                let qualified = dir.join(program);
                names.extend(with_extensions(&qualified.to_string_lossy()));
            }
        }
        names
    }
}

/// Runs `argv` through the fallback tiers of `policy`.
///
/// # Errors
///
/// [`ShellError::CommandNotFound`] with the name as typed when no tier can
/// launch it, or the I/O error of a launch that failed for another reason.
pub fn dispatch(
    launcher: &mut dyn Launcher,
    policy: &DispatchPolicy,
    argv: &[String],
    env: &LaunchEnv<'_>,
) -> Result<i32, ShellError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ShellError::CommandNotFound(String::new()));
    };

    for candidate in policy.candidates(program) {
        let mut attempt = Vec::with_capacity(argv.len());
        attempt.push(candidate);
        attempt.extend_from_slice(args);

        match launcher.launch(&attempt, env) {
            Ok(code) => {
                tracing::debug!(program = %attempt[0], code, "program exited");
                return Ok(code);
            }
            Err(LaunchError::NotFound) => {
                tracing::trace!(program = %attempt[0], "not found, trying next spelling");
            }
            Err(LaunchError::Failed(e)) => return Err(e.into()),
        }
    }
    Err(ShellError::CommandNotFound(program.clone()))
}

/// Resolve a command path the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - `./foo` (any relative path on non-Unix platforms): returned if it exists.
/// - Single component: the first match in `search_paths`.
/// - Several components (`bin/tool`): returned if it exists.
/// - Empty path: `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.is_file() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}
