//! Minimum-interval redraw gate.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

/// `now - last >= min_interval`. A sink that has never drawn always may.
#[must_use]
pub fn should_refresh(now: Instant, last_refresh: Option<Instant>, min_interval: Duration) -> bool {
    last_refresh.is_none_or(|last| now.saturating_duration_since(last) >= min_interval)
}

/// Tracks the last redraw and gates high-frequency callers.
#[derive(Debug, Clone, Copy)]
pub struct RefreshThrottle {
    min_interval: Duration,
    last_refresh: Option<Instant>,
}

impl RefreshThrottle {
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_refresh: None,
        }
    }

    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub const fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }

    pub fn should_refresh(&self, now: Instant) -> bool {
        should_refresh(now, self.last_refresh, self.min_interval)
    }

    /// Record a completed redraw.
    pub fn mark(&mut self, now: Instant) {
        self.last_refresh = Some(now);
    }

    /// Check and mark in one step; true if the caller should draw now.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.should_refresh(now) {
            self.mark(now);
            true
        } else {
            false
        }
    }

    /// Bypass the interval (used right after user input).
    pub fn force(&mut self, now: Instant) {
        self.mark(now);
    }

    /// Forget the last redraw so the next check passes.
    pub fn reset(&mut self) {
        self.last_refresh = None;
    }
}
