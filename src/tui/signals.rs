//! Operator interrupt and terminal resize flags.
//!
//! SIGINT/SIGTERM set the interrupt flag, SIGWINCH sets the resize flag. The
//! input pump checks both between bounded read slices instead of blocking on
//! signals, so an interrupt is seen within one poll slice.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared signal state. Cloning shares the flags.
#[derive(Debug, Clone, Default)]
pub struct SignalFlags {
    interrupt: Arc<AtomicBool>,
    resize: Arc<AtomicBool>,
    failures: Vec<String>,
}

impl SignalFlags {
    /// Flags that only change when set programmatically.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Flags wired to the process signals. Registration is best-effort:
    /// failures are kept in [`registration_failures`](Self::registration_failures)
    /// for the caller to log, and the flags still work when set by hand.
    #[must_use]
    pub fn register() -> Self {
        let mut flags = Self::default();
        flags.register_signals();
        flags
    }

    pub fn registration_failures(&self) -> &[String] {
        &self.failures
    }

    pub fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Check and clear the pending resize notification.
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::Relaxed)
    }

    pub fn request_interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    pub fn request_resize(&self) {
        self.resize.store(true, Ordering::Relaxed);
    }

    /// Clear the interrupt flag once it has been handled.
    pub fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }

    #[cfg(feature = "signals")]
    fn register_signals(&mut self) {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let mut wanted = vec![
            ("SIGINT", SIGINT, Arc::clone(&self.interrupt)),
            ("SIGTERM", SIGTERM, Arc::clone(&self.interrupt)),
        ];
        #[cfg(unix)]
        wanted.push(("SIGWINCH", signal_hook::consts::SIGWINCH, Arc::clone(&self.resize)));

        for (name, signal, flag) in wanted {
            if let Err(e) = signal_hook::flag::register(signal, flag) {
                self.failures
                    .push(format!("[WD-SIGNAL] failed to register {name}: {e}"));
            }
        }
    }

    #[cfg(not(feature = "signals"))]
    fn register_signals(&mut self) {}
}
