//! Scanner, selector and attack views.
//!
//! Each view owns its state, turns keys into [`ViewAction`]s, and composes a
//! plain-text [`Frame`] for a [`DisplaySink`](crate::tui::sink::DisplaySink).
//! The helpers below are shared column formatters.

#![allow(missing_docs)]

pub mod attack;
pub mod scanner;
pub mod selector;

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::tui::input::{ViewAction, ViewKind, contextual_help};
use crate::tui::keys::Key;
use crate::tui::sink::{Frame, clip};

pub use attack::AttackView;
pub use scanner::ScannerView;
pub use selector::SelectorView;

/// Signal at or above this is drawn as three bars.
pub const STRONG_SIGNAL_DBM: i32 = -50;
/// Signal at or above this is drawn as two bars.
pub const MEDIUM_SIGNAL_DBM: i32 = -70;

/// Width of the attack progress bar in cells.
pub const PROGRESS_BAR_WIDTH: usize = 40;

/// Both clocks a render needs: monotonic for elapsed timers, wall clock for
/// session ages.
#[derive(Debug, Clone, Copy)]
pub struct Moment {
    pub at: Instant,
    pub wall: DateTime<Utc>,
}

impl Moment {
    #[must_use]
    pub fn now() -> Self {
        Self {
            at: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// Common view surface used by the runtime loops.
pub trait View {
    fn kind(&self) -> ViewKind;

    fn handle_input(&mut self, key: Key) -> ViewAction;

    /// Whether the help overlay is currently shown.
    fn help_open(&self) -> bool;

    /// Whether the view wants a redraw without any new input or event.
    fn refresh_due(&self, _now: Instant) -> bool {
        false
    }

    /// Compose the screen for a display of `size` (`columns`, `rows`).
    fn compose(&mut self, size: (u16, u16), now: Moment) -> Frame;
}

// ──────────────────── scan rows ────────────────────

/// What the views need from a discovered access point.
pub trait TargetRow {
    fn identifier(&self) -> &str;
    /// Network name; `None` for hidden networks.
    fn label(&self) -> Option<&str>;
    fn channel(&self) -> u16;
    fn signal_dbm(&self) -> i32;
    fn security(&self) -> &str;
    fn wps(&self) -> WpsStatus;
    fn client_count(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WpsStatus {
    #[default]
    None,
    Unlocked,
    Locked,
    Unknown,
}

impl WpsStatus {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::None => "-",
            Self::Unlocked => "✓",
            Self::Locked => "✗",
            Self::Unknown => "?",
        }
    }

    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Access point as reported by scan discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub bssid: String,
    #[serde(default)]
    pub essid: Option<String>,
    #[serde(default)]
    pub channel: u16,
    #[serde(default)]
    pub encryption: String,
    /// dBm, or a positive 0..100 quality figure from older drivers.
    #[serde(default)]
    pub power: i32,
    #[serde(default)]
    pub wps: WpsStatus,
    #[serde(default)]
    pub clients: u32,
    #[serde(default)]
    pub decloaked: bool,
}

impl TargetRow for ScanTarget {
    fn identifier(&self) -> &str {
        &self.bssid
    }

    fn label(&self) -> Option<&str> {
        self.essid.as_deref().filter(|e| !e.is_empty())
    }

    fn channel(&self) -> u16 {
        self.channel
    }

    fn signal_dbm(&self) -> i32 {
        if self.power > 0 { self.power - 100 } else { self.power }
    }

    fn security(&self) -> &str {
        &self.encryption
    }

    fn wps(&self) -> WpsStatus {
        self.wps
    }

    fn client_count(&self) -> usize {
        self.clients as usize
    }
}

/// Coarse security classification used for header counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityClass {
    Open,
    Wep,
    Wpa,
    Wpa3,
}

impl SecurityClass {
    #[must_use]
    pub fn classify(encryption: &str) -> Self {
        let upper = encryption.to_ascii_uppercase();
        if upper.contains("WPA3") || upper.contains("SAE") {
            Self::Wpa3
        } else if upper.contains("WPA") {
            Self::Wpa
        } else if upper.contains("WEP") {
            Self::Wep
        } else {
            Self::Open
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalLevel {
    Strong,
    Medium,
    Weak,
}

impl SignalLevel {
    #[must_use]
    pub const fn from_dbm(dbm: i32) -> Self {
        if dbm >= STRONG_SIGNAL_DBM {
            Self::Strong
        } else if dbm >= MEDIUM_SIGNAL_DBM {
            Self::Medium
        } else {
            Self::Weak
        }
    }

    pub const fn bars(self) -> &'static str {
        match self {
            Self::Strong => "███",
            Self::Medium => "██ ",
            Self::Weak => "█  ",
        }
    }
}

// ──────────────────── formatting ────────────────────

/// Left-align `text` in exactly `width` cells, truncating if needed.
pub fn cell(text: &str, width: usize) -> String {
    let mut out = clip(text, width).to_string();
    let used = UnicodeWidthStr::width(out.as_str());
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    out
}

/// Right-align `text` in `width` cells.
pub fn cell_right(text: &str, width: usize) -> String {
    format!("{text:>width$}")
}

/// Network name or `<hidden>`, truncated to 20 characters.
pub fn essid_cell<R: TargetRow>(row: &R) -> String {
    cell(row.label().unwrap_or("<hidden>"), 20)
}

/// `[██████░░░░] 60%`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let clamped = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled = ((clamped * width as f64).floor() as usize).min(width);
    format!(
        "[{}{}] {:.0}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        clamped * 100.0
    )
}

/// `MM:SS` (minutes keep growing past an hour).
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Help overlay for `view`.
pub fn help_frame(view: ViewKind) -> Frame {
    let help = contextual_help(view);
    let mut frame = Frame::new(help.title);
    frame.blank();
    for binding in &help.bindings {
        frame.push(format!("  {}  {}", cell(binding.keys, 15), binding.description));
    }
    frame.blank();
    frame.push("Press any key to return");
    frame
}
