//! Scoped raw-mode acquisition.
//!
//! [`RawModeGuard`] switches the terminal to raw, non-echoing input on
//! acquisition and restores the previous mode exactly once: on
//! [`RawModeGuard::release`], on [`Drop`] (early return, `?`, unwind), or from
//! the panic hook, whichever comes first. A panic hook is installed so the
//! terminal is restored *before* the panic message is printed and the
//! backtrace stays readable.

#![allow(missing_docs)]

use std::io;
use std::panic;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{self, LeaveAlternateScreen};

use crate::core::errors::{DashError, Result};

/// Set while the process holds the real terminal in raw mode. The panic hook
/// and [`CrosstermRawMode::leave`] both `swap` it, so only one of them ever
/// restores.
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

static PANIC_HOOK: Once = Once::new();

/// A reversible terminal mode switch.
pub trait ModeSwitch {
    fn enter(&mut self) -> io::Result<()>;
    fn leave(&mut self) -> io::Result<()>;
}

/// Raw mode on the controlling terminal via crossterm.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermRawMode;

impl ModeSwitch for CrosstermRawMode {
    fn enter(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn leave(&mut self) -> io::Result<()> {
        if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
            terminal::disable_raw_mode()?;
        }
        Ok(())
    }
}

/// Holds the terminal in raw mode for its lifetime.
pub struct RawModeGuard<M: ModeSwitch = CrosstermRawMode> {
    mode: M,
    released: bool,
}

impl RawModeGuard<CrosstermRawMode> {
    /// Raw mode on the controlling terminal.
    pub fn terminal() -> Result<Self> {
        Self::acquire(CrosstermRawMode)
    }
}

impl<M: ModeSwitch> RawModeGuard<M> {
    /// Enter the mode and arm restoration.
    pub fn acquire(mut mode: M) -> Result<Self> {
        install_panic_hook();
        mode.enter().map_err(|e| DashError::terminal(&e))?;
        Ok(Self {
            mode,
            released: false,
        })
    }

    pub const fn is_active(&self) -> bool {
        !self.released
    }

    /// Restore the previous mode, surfacing failure.
    ///
    /// A failed restore leaves the operator's shell unusable, so it comes back
    /// as the fatal [`DashError::TerminalRestore`].
    pub fn release(mut self) -> Result<()> {
        self.restore()
            .map_err(|e| DashError::TerminalRestore { details: e.to_string() })
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.mode.leave()
    }
}

impl<M: ModeSwitch> Drop for RawModeGuard<M> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            eprintln!("[WD-TERM] failed to restore terminal mode: {e}; run `reset`");
        }
    }
}

/// Install the restore-first panic hook once per process.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let prev = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal_best_effort();
            prev(info);
        }));
    });
}

/// Leave raw mode, the alternate screen and the hidden cursor if raw mode is
/// still held. Safe to call any number of times.
pub fn restore_terminal_best_effort() {
    if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
        let _ = terminal::disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, Show);
    }
}

/// Whether this process currently holds the real terminal in raw mode.
pub fn raw_mode_active() -> bool {
    RAW_MODE_ACTIVE.load(Ordering::SeqCst)
}

// ──────────────────── tests ────────────────────
