//! Ctrl+C handling.
//!
//! SIGINT is recorded only while a statement is running; at the prompt the
//! terminal is in raw mode and the line editor sees Ctrl+C as a key instead.

use crate::error::ShellError;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct InterruptState {
    running: AtomicBool,
    pending: AtomicBool,
}

/// Marks the owning state as running until dropped.
pub struct RunningGuard<'a> {
    state: &'a InterruptState,
}

impl InterruptState {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    /// Record an interrupt. Ignored while idle.
    pub fn notify(&self) {
        if self.running.load(Ordering::SeqCst) {
            self.pending.store(true, Ordering::SeqCst);
        }
    }

    pub fn enter(&self) -> RunningGuard<'_> {
        self.pending.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        RunningGuard { state: self }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Consumes a pending interrupt.
    pub fn check(&self) -> Result<(), ShellError> {
        if self.pending.swap(false, Ordering::SeqCst) {
            Err(ShellError::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl Default for InterruptState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
    }
}

/// Process-wide state fed by the SIGINT handler.
pub static GLOBAL: InterruptState = InterruptState::new();

#[cfg(unix)]
extern "C" fn on_sigint(_: nix::libc::c_int) {
    GLOBAL.notify();
}

/// Route SIGINT to [`GLOBAL`].
#[cfg(unix)]
pub fn install() -> nix::Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only touches atomics.
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    tracing::debug!("SIGINT handler installed");
    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_interrupts_are_ignored() {
        let state = InterruptState::new();
        state.notify();
        let _guard = state.enter();
        assert!(state.check().is_ok());
    }

    #[test]
    fn test_running_interrupt_is_reported_once() {
        let state = InterruptState::new();
        let guard = state.enter();
        state.notify();
        assert!(matches!(state.check(), Err(ShellError::Interrupted)));
        assert!(state.check().is_ok());
        drop(guard);
        assert!(!state.is_running());
    }

    #[test]
    fn test_guard_restores_idle_on_early_return() {
        let state = InterruptState::new();
        let run = || -> Result<(), ShellError> {
            let _guard = state.enter();
            Err(ShellError::InvalidArgument("x".into()))
        };
        assert!(run().is_err());
        assert!(!state.is_running());
    }
}
