//! Capability traits over the terminal and the operating system, with the
//! native implementations used by the binary.

use crate::editor::Key;
use crate::error::ShellError;
use crate::style::{self, RED};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Raw keyboard input and echo for the line editor.
pub trait TerminalIO {
    fn enter_raw(&mut self) -> io::Result<()>;
    fn leave_raw(&mut self) -> io::Result<()>;
    /// Blocks until a key the editor understands is pressed.
    fn read_key(&mut self) -> io::Result<Key>;
    fn write_str(&mut self, text: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    /// Columns between the cursor and the right edge of the screen.
    fn columns_remaining(&mut self) -> io::Result<usize>;
}

/// Terminal operations used by built-ins.
pub trait Console {
    fn set_title(&mut self, title: &str) -> io::Result<()>;
    fn clear_screen(&mut self) -> io::Result<()>;
    /// Shows `prompt` and reads a yes/no answer; only `y`/`Y` confirms.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
    /// `(columns, rows)`, if known.
    fn size(&self) -> Option<(u16, u16)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    User,
    Elevated,
}

/// Raising and restoring the privilege level of the shell process.
pub trait PrivilegeControl {
    fn current(&self) -> Privilege;
    fn set(&mut self, level: Privilege) -> Result<(), ShellError>;
}

/// Facts about the host shown by `uptime` and `neofetch`.
pub trait SystemInfo {
    fn uptime(&self) -> io::Result<Duration>;
    fn os_name(&self) -> String;
    fn hostname(&self) -> String;
}

/// Terminal backed by crossterm on the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct CrosstermTerminal;

fn decode_key(event: KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);

    let key = match event.code {
        KeyCode::Char('c') if ctrl => Key::Interrupt,
        KeyCode::Char('d') if ctrl => Key::Eof,
        KeyCode::Char('w') if ctrl => Key::WordDelete,
        KeyCode::Char('a') if ctrl => Key::Home,
        KeyCode::Char('e') if ctrl => Key::End,
        KeyCode::Char(_) if ctrl || alt => return None,
        KeyCode::Char(ch) => Key::Char(ch),
        KeyCode::Backspace if ctrl || alt => Key::WordDelete,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Tab => Key::Tab,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left if ctrl => Key::CtrlLeft,
        KeyCode::Right if ctrl => Key::CtrlRight,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Enter => Key::Enter,
        _ => return None,
    };
    Some(key)
}

impl TerminalIO for CrosstermTerminal {
    fn enter_raw(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()
    }

    fn leave_raw(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()
    }

    fn read_key(&mut self) -> io::Result<Key> {
        loop {
            if let Event::Key(event) = event::read()? {
                if let Some(key) = decode_key(event) {
                    return Ok(key);
                }
            }
        }
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        io::stdout().write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }

    fn columns_remaining(&mut self) -> io::Result<usize> {
        let (width, _) = terminal::size()?;
        let (column, _) = cursor::position()?;
        Ok(usize::from(width.saturating_sub(column)))
    }
}

impl Console for CrosstermTerminal {
    fn set_title(&mut self, title: &str) -> io::Result<()> {
        execute!(io::stdout(), terminal::SetTitle(title))
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        execute!(
            io::stdout(),
            terminal::Clear(terminal::ClearType::All),
            terminal::Clear(terminal::ClearType::Purge),
            cursor::MoveTo(0, 0)
        )
    }

    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", style::paint(prompt, RED))?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }

    fn size(&self) -> Option<(u16, u16)> {
        terminal::size().ok()
    }
}

/// Effective-uid switching for the current process.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct ProcessPrivileges;

#[cfg(unix)]
impl PrivilegeControl for ProcessPrivileges {
    fn current(&self) -> Privilege {
        if nix::unistd::geteuid().is_root() {
            Privilege::Elevated
        } else {
            Privilege::User
        }
    }

    fn set(&mut self, level: Privilege) -> Result<(), ShellError> {
        use nix::unistd::{Uid, getuid, seteuid};

        let target = match level {
            Privilege::Elevated => Uid::from_raw(0),
            Privilege::User => getuid(),
        };
        seteuid(target).map_err(|errno| ShellError::ElevationDenied(errno.desc().to_string()))?;
        tracing::debug!(?level, uid = target.as_raw(), "effective uid changed");
        Ok(())
    }
}

/// Privilege control on platforms without a uid model.
#[cfg(not(unix))]
#[derive(Debug, Default)]
pub struct ProcessPrivileges;

#[cfg(not(unix))]
impl PrivilegeControl for ProcessPrivileges {
    fn current(&self) -> Privilege {
        Privilege::User
    }

    fn set(&mut self, level: Privilege) -> Result<(), ShellError> {
        match level {
            Privilege::User => Ok(()),
            Privilege::Elevated => Err(ShellError::ElevationDenied(
                "elevation is not supported on this platform".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default)]
pub struct NativeSystemInfo;

impl SystemInfo for NativeSystemInfo {
    /// `/proc/uptime` where it exists, else the boot-relative clock.
    #[cfg(unix)]
    fn uptime(&self) -> io::Result<Duration> {
        match std::fs::read_to_string("/proc/uptime") {
            Ok(text) => parse_proc_uptime(&text).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "malformed /proc/uptime")
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => clock_uptime(),
            Err(e) => Err(e),
        }
    }

    #[cfg(windows)]
    fn uptime(&self) -> io::Result<Duration> {
        use windows_sys::Win32::System::SystemInformation::GetTickCount64;

        // SAFETY: GetTickCount64 has no preconditions.
        let millis = unsafe { GetTickCount64() };
        Ok(Duration::from_millis(millis))
    }

    #[cfg(not(any(unix, windows)))]
    fn uptime(&self) -> io::Result<Duration> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "uptime is not available on this platform",
        ))
    }

    #[cfg(unix)]
    fn os_name(&self) -> String {
        match nix::sys::utsname::uname() {
            Ok(info) => format!(
                "{} {} {}",
                info.sysname().to_string_lossy(),
                info.release().to_string_lossy(),
                info.version().to_string_lossy()
            ),
            Err(_) => std::env::consts::OS.to_string(),
        }
    }

    #[cfg(not(unix))]
    fn os_name(&self) -> String {
        std::env::consts::OS.to_string()
    }

    #[cfg(unix)]
    fn hostname(&self) -> String {
        nix::unistd::gethostname()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    #[cfg(not(unix))]
    fn hostname(&self) -> String {
        std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Time since boot from the system clock that counts it.
#[cfg(unix)]
fn clock_uptime() -> io::Result<Duration> {
    use nix::time::{ClockId, clock_gettime};

    #[cfg(any(target_os = "linux", target_os = "android"))]
    let clock = ClockId::CLOCK_BOOTTIME;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let clock = ClockId::CLOCK_MONOTONIC;

    let now = clock_gettime(clock).map_err(io::Error::from)?;
    let secs = u64::try_from(now.tv_sec()).unwrap_or(0);
    let nanos = u32::try_from(now.tv_nsec()).unwrap_or(0);
    Ok(Duration::new(secs, nanos))
}

/// First field of `/proc/uptime`: seconds since boot.
#[cfg(unix)]
fn parse_proc_uptime(text: &str) -> Option<Duration> {
    let secs: f64 = text.split_whitespace().next()?.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
