//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use wardash::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DashError, Result};

// Logging
pub use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};

// Input
pub use crate::tui::input::{ViewAction, ViewKind};
pub use crate::tui::keys::{ByteSource, Key, KeyDecoder, ScriptedBytes};
pub use crate::tui::signals::SignalFlags;
pub use crate::tui::terminal_guard::RawModeGuard;

// State
pub use crate::tui::bounded_log::BoundedLog;
pub use crate::tui::list::NavigableList;
pub use crate::tui::progress::{AttackEvent, AttackKind, ProgressState, ProgressUpdate};
pub use crate::tui::session::{SessionProjection, SessionRecord};
pub use crate::tui::throttle::RefreshThrottle;

// Display
pub use crate::tui::runtime::{AttackDesk, InputPump, ViewDesk, run_selector};
pub use crate::tui::sink::{DisplaySink, Frame, MemorySink, TerminalController};
pub use crate::tui::views::{AttackView, ScanTarget, ScannerView, SelectorView, View};
