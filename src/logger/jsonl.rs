//! JSONL diagnostics log: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! concurrent `tail -f` never sees a partial record.
//!
//! Degradation chain:
//! 1. Primary file path
//! 2. stderr with `[WD-JSONL]` prefix
//! 3. Silent discard (the dashboard must never crash for logging failures)
//!
//! While a full-screen view owns the terminal, stderr output is held in a
//! bounded buffer (see [`JsonlWriter::hold_stderr`]) and written out once the
//! screen is restored.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::config::LoggingConfig;
use crate::core::errors::{DashError, Result};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Dashboard lifecycle and interaction events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TuiStart,
    TuiStop,
    KeyPress,
    Render,
    ViewChange,
    Resize,
    Interrupt,
    Error,
}

/// A single JSONL record. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// View that produced the event (`scanner`, `selector`, `attack`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    /// Canonical key name for `key_press`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            view: None,
            key: None,
            duration_ms: None,
            error_code: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach the stable code and message of a crate error.
    #[must_use]
    pub fn with_error(mut self, error: &DashError) -> Self {
        self.error_code = Some(error.code().to_string());
        self.details = Some(error.to_string());
        self
    }
}

/// Degradation state of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Writer settings.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Emit `debug` severity records.
    pub debug: bool,
    /// Rotate to `<path>.1` once the file passes this size. Default: 16 MiB.
    pub max_size_bytes: u64,
}

impl JsonlConfig {
    #[must_use]
    pub fn from_logging(logging: &LoggingConfig) -> Self {
        Self {
            path: logging.path.clone(),
            debug: logging.debug,
            max_size_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Stderr lines kept while the terminal is held; older ones are dropped.
const MAX_HELD_LINES: usize = 256;

/// Append-only JSONL writer with single-generation rotation and fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
    held: Option<VecDeque<String>>,
}

impl JsonlWriter {
    /// Open the log file. Falls through the degradation chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
            held: None,
        };
        match open_append(&w.config.path) {
            Ok((file, size)) => {
                w.writer = Some(BufWriter::new(file));
                w.state = WriterState::Normal;
                w.bytes_written = size;
            }
            Err(e) => {
                w.emit_stderr(format!("[WD-JSONL] {e}; logging to stderr\n"));
                w.state = WriterState::Stderr;
            }
        }
        w
    }

    /// Write one entry as a single JSONL line. Debug entries are dropped
    /// unless the writer was opened with `debug`.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        if entry.severity == Severity::Debug && !self.config.debug {
            return;
        }
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                self.emit_stderr(format!("[WD-JSONL] serialize error: {e}\n"));
                return;
            }
        };
        self.write_line(&line);
    }

    /// Convenience wrapper for the common case.
    pub fn log(&mut self, event: EventType, severity: Severity, details: impl Into<String>) {
        self.write_entry(&LogEntry::new(event, severity).with_details(details));
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Buffer stderr output instead of writing it; the terminal is showing
    /// a full-screen view.
    pub fn hold_stderr(&mut self) {
        if self.held.is_none() {
            self.held = Some(VecDeque::new());
        }
    }

    /// Stop buffering and write out everything held so far. Returns the
    /// number of lines written.
    pub fn release_stderr(&mut self) -> usize {
        let Some(held) = self.held.take() else {
            return 0;
        };
        let mut stderr = io::stderr().lock();
        for line in &held {
            let _ = stderr.write_all(line.as_bytes());
        }
        held.len()
    }

    /// Lines waiting for [`release_stderr`](Self::release_stderr).
    pub fn held_len(&self) -> usize {
        self.held.as_ref().map_or(0, VecDeque::len)
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        if self.state == WriterState::Normal
            && self.bytes_written + line.len() as u64 > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal => {
                let Some(w) = self.writer.as_mut() else {
                    self.degrade();
                    self.write_line(line);
                    return;
                };
                if w.write_all(line.as_bytes()).is_err() {
                    self.degrade();
                    self.write_line(line);
                    return;
                }
                self.bytes_written += line.len() as u64;
            }
            WriterState::Stderr => {
                if !self.emit_stderr(format!("[WD-JSONL] {line}")) {
                    self.degrade();
                }
            }
            WriterState::Discard => {}
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        let current = self.state;
        self.state = match current {
            WriterState::Normal => {
                self.emit_stderr("[WD-JSONL] write failed, using stderr\n".to_string());
                WriterState::Stderr
            }
            WriterState::Stderr | WriterState::Discard => WriterState::Discard,
        };
    }

    /// Write `text` to stderr, or hold it while the terminal is taken.
    fn emit_stderr(&mut self, text: String) -> bool {
        match self.held.as_mut() {
            Some(held) => {
                held.push_back(text);
                while held.len() > MAX_HELD_LINES {
                    held.pop_front();
                }
                true
            }
            None => io::stderr().write_all(text.as_bytes()).is_ok(),
        }
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let path = self.config.path.clone();
        let _ = fs::rename(&path, rotated_name(&path));
        match open_append(&path) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
        self.release_stderr();
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| DashError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| DashError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `foo.jsonl` → `foo.jsonl.1`.
fn rotated_name(base: &Path) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
