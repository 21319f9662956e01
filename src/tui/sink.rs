//! Display sinks: where composed frames go.
//!
//! Views never paint cells themselves. They compose a [`Frame`] and hand it to
//! a [`DisplaySink`], which decides whether the frame is drawn now
//! (throttled [`DisplaySink::update`]) or unconditionally
//! ([`DisplaySink::force_update`]). A sink that is not running swallows every
//! request silently; drawing resumes once it is started again.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use unicode_width::UnicodeWidthChar;

use crate::core::config::{Config, DisplayConfig};
use crate::core::errors::{DashError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use crate::tui::throttle::RefreshThrottle;

/// Fallback geometry when the terminal cannot be queried.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

// ──────────────────── frame ────────────────────

/// One fully composed screen: a title row followed by body lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub title: String,
    pub lines: Vec<String>,
}

impl Frame {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Title and body joined with newlines.
    pub fn text(&self) -> String {
        let mut out = self.title.clone();
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.title.contains(needle) || self.lines.iter().any(|l| l.contains(needle))
    }
}

// ──────────────────── sink contract ────────────────────

/// Output sink shared by every view.
pub trait DisplaySink {
    fn is_running(&self) -> bool;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// `(columns, rows)`.
    fn terminal_size(&self) -> (u16, u16);

    /// Redraw gate owned by the sink.
    fn throttle_mut(&mut self) -> &mut RefreshThrottle;

    /// Unconditionally paint `frame`.
    fn draw(&mut self, frame: &Frame) -> Result<()>;

    /// Diagnostics hook; sinks without a log ignore it.
    fn record(&mut self, _entry: LogEntry) {}

    /// Draw unless the last draw was less than the minimum interval ago.
    /// Returns whether the frame was drawn.
    fn update(&mut self, frame: &Frame) -> Result<bool> {
        if !self.is_running() {
            return Ok(false);
        }
        if !self.throttle_mut().try_acquire(Instant::now()) {
            return Ok(false);
        }
        self.draw(frame)?;
        Ok(true)
    }

    /// Draw now, bypassing the interval.
    fn force_update(&mut self, frame: &Frame) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.throttle_mut().force(Instant::now());
        self.draw(frame)
    }
}

// ──────────────────── terminal controller ────────────────────

#[derive(Debug, Clone, Copy)]
enum SizeSource {
    Terminal,
    Fixed(u16, u16),
}

/// crossterm-backed sink: alternate screen, hidden cursor, full repaint.
///
/// Constructed once by the program and passed to every view; its
/// `start`/`stop` bracket the whole interactive session.
pub struct TerminalController<W: Write> {
    out: W,
    running: bool,
    throttle: RefreshThrottle,
    min_width: u16,
    min_height: u16,
    size: SizeSource,
    logger: Option<JsonlWriter>,
    renders: u64,
}

impl TerminalController<io::Stdout> {
    /// Controller on stdout, logging to the configured JSONL file if enabled.
    #[must_use]
    pub fn stdout(config: &Config) -> Self {
        let mut controller = Self::new(io::stdout(), &config.display);
        if config.logging.enabled {
            controller.logger = Some(JsonlWriter::open(JsonlConfig::from_logging(&config.logging)));
        }
        controller
    }
}

impl<W: Write> TerminalController<W> {
    #[must_use]
    pub fn new(out: W, display: &DisplayConfig) -> Self {
        Self {
            out,
            running: false,
            throttle: RefreshThrottle::new(Duration::from_millis(display.min_update_interval_ms)),
            min_width: display.min_width,
            min_height: display.min_height,
            size: SizeSource::Terminal,
            logger: None,
            renders: 0,
        }
    }

    /// Report a fixed geometry instead of querying the tty.
    #[must_use]
    pub const fn with_fixed_size(mut self, width: u16, height: u16) -> Self {
        self.size = SizeSource::Fixed(width, height);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: JsonlWriter) -> Self {
        self.logger = Some(logger);
        self
    }

    pub const fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub const fn logger(&self) -> Option<&JsonlWriter> {
        self.logger.as_ref()
    }

    fn log(&mut self, entry: LogEntry) {
        if let Some(logger) = self.logger.as_mut() {
            logger.write_entry(&entry);
        }
    }

    fn log_error(&mut self, error: &DashError) {
        self.log(LogEntry::new(EventType::Error, Severity::Error).with_error(error));
    }

    fn paint(&mut self, frame: &Frame) -> io::Result<()> {
        let (width, height) = self.terminal_size();
        let width = usize::from(width);
        queue!(self.out, MoveTo(0, 0), Clear(ClearType::All))?;
        write!(self.out, "{}", screen_line(&frame.title, width))?;
        for (row, line) in frame.lines.iter().enumerate().take(usize::from(height.saturating_sub(1))) {
            queue!(self.out, MoveTo(0, row as u16 + 1))?;
            write!(self.out, "{}", screen_line(line, width))?;
        }
        self.out.flush()
    }
}

impl<W: Write> DisplaySink for TerminalController<W> {
    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        let (width, height) = self.terminal_size();
        if width < self.min_width || height < self.min_height {
            let err = DashError::TerminalTooSmall {
                width,
                height,
                min_width: self.min_width,
                min_height: self.min_height,
            };
            self.log_error(&err);
            return Err(err);
        }
        execute!(self.out, EnterAlternateScreen, Hide, Clear(ClearType::All))
            .map_err(|e| DashError::terminal(&e))?;
        if let Some(logger) = self.logger.as_mut() {
            logger.hold_stderr();
        }
        self.running = true;
        self.throttle.reset();
        self.log(
            LogEntry::new(EventType::TuiStart, Severity::Info)
                .with_details(format!("terminal {width}x{height}")),
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        let restored = execute!(self.out, Show, LeaveAlternateScreen);
        let renders = self.renders;
        self.log(
            LogEntry::new(EventType::TuiStop, Severity::Info)
                .with_details(format!("{renders} renders")),
        );
        if let Some(logger) = self.logger.as_mut() {
            logger.flush();
            logger.release_stderr();
        }
        restored.map_err(|e| DashError::terminal(&e))
    }

    fn terminal_size(&self) -> (u16, u16) {
        match self.size {
            SizeSource::Fixed(w, h) => (w, h),
            SizeSource::Terminal => terminal::size().unwrap_or(FALLBACK_SIZE),
        }
    }

    fn throttle_mut(&mut self) -> &mut RefreshThrottle {
        &mut self.throttle
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        let started = Instant::now();
        if let Err(e) = self.paint(frame) {
            let err = DashError::terminal(&e);
            self.log_error(&err);
            return Err(err);
        }
        self.renders += 1;
        self.log(
            LogEntry::new(EventType::Render, Severity::Debug)
                .with_view(frame.title.clone())
                .with_duration(started.elapsed()),
        );
        Ok(())
    }

    fn record(&mut self, entry: LogEntry) {
        self.log(entry);
    }
}

impl<W: Write> Drop for TerminalController<W> {
    fn drop(&mut self) {
        if self.running
            && let Err(e) = self.stop()
        {
            self.log_error(&e);
        }
    }
}

/// Longest prefix of `line` that fits in `width` terminal columns.
/// Zero-width and control characters take no columns.
pub fn clip(line: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in line.char_indices() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            return &line[..idx];
        }
        used += w;
    }
    line
}

/// `line` clipped to `width` columns with control characters replaced, so
/// text from scan data cannot move the cursor or restyle the screen.
fn screen_line(line: &str, width: usize) -> String {
    clip(line, width)
        .chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .collect()
}

// ──────────────────── headless sink ────────────────────

/// Frames and diagnostics a [`MemorySink`] keeps unless told otherwise.
pub const DEFAULT_MEMORY_HISTORY: usize = 256;

/// Records frames in memory. Used by tests and `--headless` replays.
///
/// Both histories are bounded: once full, the oldest frame or record is
/// dropped. The render counter keeps counting past the history.
#[derive(Debug, Clone)]
pub struct MemorySink {
    running: bool,
    size: (u16, u16),
    throttle: RefreshThrottle,
    frames: VecDeque<Frame>,
    frame_capacity: usize,
    records: VecDeque<LogEntry>,
    record_capacity: usize,
    renders: usize,
}

impl MemorySink {
    #[must_use]
    pub const fn new(width: u16, height: u16, min_interval: Duration) -> Self {
        Self {
            running: false,
            size: (width, height),
            throttle: RefreshThrottle::new(min_interval),
            frames: VecDeque::new(),
            frame_capacity: DEFAULT_MEMORY_HISTORY,
            records: VecDeque::new(),
            record_capacity: DEFAULT_MEMORY_HISTORY,
            renders: 0,
        }
    }

    /// Keep at most `frames` frames (floored at 1 so the last frame is
    /// always available) and `records` diagnostics entries.
    #[must_use]
    pub fn with_history(mut self, frames: usize, records: usize) -> Self {
        self.frame_capacity = frames.max(1);
        self.record_capacity = records;
        trim_front(&mut self.frames, self.frame_capacity);
        trim_front(&mut self.records, self.record_capacity);
        self
    }

    /// Simulate a terminal resize.
    pub const fn set_size(&mut self, width: u16, height: u16) {
        self.size = (width, height);
    }

    /// Retained frames, oldest first.
    pub const fn frames(&self) -> &VecDeque<Frame> {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.back()
    }

    /// Frames drawn since construction, including ones no longer retained.
    pub const fn render_count(&self) -> usize {
        self.renders
    }

    pub const fn records(&self) -> &VecDeque<LogEntry> {
        &self.records
    }
}

fn trim_front<T>(queue: &mut VecDeque<T>, capacity: usize) {
    while queue.len() > capacity {
        queue.pop_front();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(FALLBACK_SIZE.0, FALLBACK_SIZE.1, Duration::ZERO)
    }
}

impl DisplaySink for MemorySink {
    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self) -> Result<()> {
        self.running = true;
        self.throttle.reset();
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }

    fn terminal_size(&self) -> (u16, u16) {
        self.size
    }

    fn throttle_mut(&mut self) -> &mut RefreshThrottle {
        &mut self.throttle
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        self.renders = self.renders.saturating_add(1);
        self.frames.push_back(frame.clone());
        trim_front(&mut self.frames, self.frame_capacity);
        Ok(())
    }

    fn record(&mut self, entry: LogEntry) {
        if self.record_capacity == 0 {
            return;
        }
        self.records.push_back(entry);
        trim_front(&mut self.records, self.record_capacity);
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(title: &str) -> Frame {
        let mut f = Frame::new(title);
        f.push("first");
        f.push("second");
        f
    }

    #[test]
    fn stopped_sink_ignores_updates() {
        let mut sink = MemorySink::default();
        assert!(!sink.update(&frame("a")).unwrap());
        sink.force_update(&frame("b")).unwrap();
        assert_eq!(sink.render_count(), 0);

        sink.start().unwrap();
        assert!(sink.update(&frame("c")).unwrap());
        assert_eq!(sink.last_frame().unwrap().title, "c");
    }

    #[test]
    fn update_is_throttled_but_force_is_not() {
        let mut sink = MemorySink::new(80, 24, Duration::from_secs(60));
        sink.start().unwrap();
        assert!(sink.update(&frame("1")).unwrap());
        assert!(!sink.update(&frame("2")).unwrap());
        sink.force_update(&frame("3")).unwrap();
        assert_eq!(sink.render_count(), 2);
        assert_eq!(sink.last_frame().unwrap().title, "3");
    }

    #[test]
    fn memory_history_is_bounded() {
        let mut sink = MemorySink::new(80, 24, Duration::ZERO).with_history(3, 2);
        sink.start().unwrap();
        for i in 0..10 {
            sink.force_update(&frame(&i.to_string())).unwrap();
            sink.record(LogEntry::new(EventType::Render, Severity::Info).with_details(i.to_string()));
        }
        assert_eq!(sink.render_count(), 10);
        let titles: Vec<&str> = sink.frames().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["7", "8", "9"]);
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.records().back().and_then(|r| r.details.as_deref()), Some("9"));
    }

    #[test]
    fn headless_history_keeps_only_last_frame() {
        let mut sink = MemorySink::default().with_history(0, 0);
        sink.start().unwrap();
        sink.record(LogEntry::new(EventType::Resize, Severity::Info));
        sink.force_update(&frame("a")).unwrap();
        sink.force_update(&frame("b")).unwrap();
        assert_eq!(sink.frames().len(), 1);
        assert_eq!(sink.last_frame().unwrap().title, "b");
        assert!(sink.records().is_empty());
    }

    #[test]
    fn controller_refuses_small_terminal() {
        let display = DisplayConfig::default();
        let mut ctl = TerminalController::new(Vec::new(), &display).with_fixed_size(60, 20);
        let err = ctl.start().unwrap_err();
        assert_eq!(err.code(), "WD-3102");
        assert!(!ctl.is_running());
        assert!(ctl.writer().is_empty());
    }

    #[test]
    fn controller_paints_clipped_frame() {
        let display = DisplayConfig {
            min_update_interval_ms: 0,
            ..DisplayConfig::default()
        };
        let mut ctl = TerminalController::new(Vec::new(), &display).with_fixed_size(80, 24);
        ctl.start().unwrap();
        let mut f = Frame::new("Title");
        f.push("x".repeat(200));
        assert!(ctl.update(&f).unwrap());
        assert_eq!(ctl.render_count(), 1);

        let out = String::from_utf8_lossy(ctl.writer()).into_owned();
        assert!(out.contains("Title"));
        assert!(out.contains(&"x".repeat(80)));
        assert!(!out.contains(&"x".repeat(81)));
        ctl.stop().unwrap();
        assert!(!ctl.is_running());
    }

    #[test]
    fn controller_logs_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tui.jsonl");
        let logger = JsonlWriter::open(JsonlConfig {
            path: path.clone(),
            debug: true,
            max_size_bytes: 1024 * 1024,
        });
        let display = DisplayConfig::default();
        let mut ctl = TerminalController::new(Vec::new(), &display)
            .with_fixed_size(100, 40)
            .with_logger(logger);
        ctl.start().unwrap();
        ctl.force_update(&frame("Scanner")).unwrap();
        ctl.stop().unwrap();
        drop(ctl);

        let raw = std::fs::read_to_string(&path).unwrap();
        let events: Vec<String> = raw
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["event"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(events, vec!["tui_start", "render", "tui_stop"]);
    }

    #[test]
    fn stderr_diagnostics_wait_for_the_screen() {
        let logger = JsonlWriter::open(JsonlConfig {
            path: std::path::PathBuf::from("/proc/wardash_no_such_dir/tui.jsonl"),
            debug: true,
            max_size_bytes: 1024 * 1024,
        });
        let display = DisplayConfig::default();
        let mut ctl = TerminalController::new(Vec::new(), &display)
            .with_fixed_size(100, 40)
            .with_logger(logger);
        ctl.start().unwrap();
        ctl.force_update(&frame("Attack")).unwrap();
        ctl.record(LogEntry::new(EventType::Interrupt, Severity::Warning));
        assert_eq!(ctl.logger().map(JsonlWriter::held_len), Some(3));
        ctl.stop().unwrap();
        assert_eq!(ctl.logger().map(JsonlWriter::held_len), Some(0));
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("█████", 3), "███");
        assert_eq!(clip("ab", 5), "ab");
    }

    #[test]
    fn clip_counts_display_columns() {
        assert_eq!(clip("无线网络", 5), "无线");
        assert_eq!(clip("ab无", 3), "ab");
        assert_eq!(clip("e\u{301}x", 2), "e\u{301}x");
    }

    #[test]
    fn screen_line_neutralises_control_characters() {
        assert_eq!(screen_line("ap\x1b[2Jnet", 80), "ap?[2Jnet");
        assert_eq!(screen_line("无线网络", 4), "无线");
    }

    #[test]
    fn controller_clips_wide_characters_by_width() {
        let display = DisplayConfig::default();
        let mut ctl = TerminalController::new(Vec::new(), &display).with_fixed_size(80, 24);
        ctl.start().unwrap();
        let mut f = Frame::new("T");
        f.push("网".repeat(60));
        ctl.force_update(&f).unwrap();
        let out = String::from_utf8_lossy(ctl.writer()).into_owned();
        assert!(out.contains(&"网".repeat(40)));
        assert!(!out.contains(&"网".repeat(41)));
    }

    #[test]
    fn frame_text_joins_lines() {
        let f = frame("T");
        assert_eq!(f.text(), "T\nfirst\nsecond");
        assert!(f.contains("second"));
    }
}
