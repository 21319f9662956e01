//! Interactive dashboard: input decoding, list and progress models, views,
//! the display sink and the event loops that drive them.

#![allow(missing_docs)]

pub mod bounded_log;
pub mod input;
pub mod keys;
pub mod list;
pub mod progress;
pub mod runtime;
pub mod session;
pub mod signals;
pub mod sink;
pub mod terminal_guard;
pub mod throttle;
pub mod views;

pub use runtime::{InputPump, ViewDesk, run_selector, run_view_loop};
