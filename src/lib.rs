#![forbid(unsafe_code)]

//! wardash: terminal dashboard core for wireless audit runs.
//!
//! Three live views share one display sink:
//! 1. **Scanner**: strongest-first table of discovered access points
//! 2. **Selector**: paged multi-select over very large target lists
//! 3. **Attack**: per-attack-kind progress, metrics, milestones and logs
//!
//! Input is decoded from raw terminal bytes with bounded waits, so interrupts
//! are observed promptly, and raw mode is restored on every exit path.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use wardash::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use wardash::core::config::Config;
//! use wardash::tui::list::NavigableList;
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod tui;
