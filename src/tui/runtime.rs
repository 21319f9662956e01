//! Event loops tying input, views, producers and the display sink together.
//!
//! One thread owns the keyboard and the sink. Producers change a view only
//! through its [`ViewDesk`], whose mutex is the one lock around that view's
//! state; the loop picks their changes up between poll slices and redraws
//! through the sink's throttle.

#![allow(missing_docs)]

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::config::{Config, PageConfig};
use crate::core::errors::{DashError, Result};
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::tui::input::{ViewAction, ViewKind};
use crate::tui::keys::{ByteSource, Key, KeyDecoder};
use crate::tui::progress::{AttackEvent, EventOutcome, ProgressUpdate};
use crate::tui::signals::SignalFlags;
use crate::tui::sink::DisplaySink;
use crate::tui::views::{AttackView, Moment, ScanTarget, ScannerView, SelectorView, TargetRow, View};

// ──────────────────── input pump ────────────────────

/// One step of the input loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEvent {
    Key(Key),
    /// A poll slice passed with no input.
    Idle,
    Resized,
    Interrupted,
}

/// Decoded keys plus signal flags, one bounded read at a time.
pub struct InputPump<S: ByteSource> {
    source: S,
    decoder: KeyDecoder,
    signals: SignalFlags,
}

impl<S: ByteSource> InputPump<S> {
    pub const fn new(source: S, decoder: KeyDecoder, signals: SignalFlags) -> Self {
        Self {
            source,
            decoder,
            signals,
        }
    }

    pub const fn from_config(source: S, config: &Config, signals: SignalFlags) -> Self {
        Self::new(source, KeyDecoder::from_config(&config.input), signals)
    }

    pub const fn signals(&self) -> &SignalFlags {
        &self.signals
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Pending signals win over keyboard input. An interrupt is reported
    /// once and then cleared.
    ///
    /// # Errors
    /// Propagates read failures from the byte source.
    pub fn next_event(&mut self) -> io::Result<PumpEvent> {
        if let Some(event) = self.pending_signal() {
            return Ok(event);
        }
        match self.decoder.next_key(&mut self.source)? {
            Some(key) => Ok(PumpEvent::Key(key)),
            None => Ok(self.pending_signal().unwrap_or(PumpEvent::Idle)),
        }
    }

    fn pending_signal(&self) -> Option<PumpEvent> {
        if self.signals.interrupted() {
            self.signals.clear_interrupt();
            return Some(PumpEvent::Interrupted);
        }
        self.signals.take_resize().then_some(PumpEvent::Resized)
    }
}

// ──────────────────── shared view ────────────────────

/// A view shared between the input loop and its producers.
pub struct ViewDesk<V> {
    view: Mutex<V>,
    dirty: AtomicBool,
    finished: AtomicBool,
    cancelled: AtomicBool,
}

pub type ScanDesk<R = ScanTarget> = ViewDesk<ScannerView<R>>;
pub type AttackDesk<R = ScanTarget> = ViewDesk<AttackView<R>>;

impl<V> ViewDesk<V> {
    pub const fn new(view: V) -> Self {
        Self {
            view: Mutex::new(view),
            dirty: AtomicBool::new(true),
            finished: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Mutate the view under its lock and flag it for redraw.
    pub fn update<T>(&self, f: impl FnOnce(&mut V) -> T) -> T {
        let out = f(&mut self.view.lock());
        self.dirty.store(true, Ordering::Release);
        out
    }

    pub fn inspect<T>(&self, f: impl FnOnce(&V) -> T) -> T {
        f(&self.view.lock())
    }

    /// The producer has nothing more to report.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// The input loop has exited; producers should stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn into_inner(self) -> V {
        self.view.into_inner()
    }
}

impl<R: TargetRow> ViewDesk<AttackView<R>> {
    pub fn apply_event(&self, event: AttackEvent, now: Instant) -> EventOutcome {
        self.update(|view| view.handle_event(event, now))
    }

    pub fn update_progress(&self, update: ProgressUpdate) {
        self.update(|view| view.update_progress(update));
    }

    pub fn add_log(&self, message: &str) {
        self.update(|view| view.add_log(message));
    }
}

impl<R: TargetRow> ViewDesk<ScannerView<R>> {
    pub fn update_targets(&self, targets: Vec<R>, decloaking: bool) {
        self.update(|view| view.update_targets(targets, decloaking));
    }
}

/// Marks the desk finished even if the producer unwinds.
struct FinishOnDrop<'a, V>(&'a ViewDesk<V>);

impl<V> Drop for FinishOnDrop<'_, V> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

// ──────────────────── view loop ────────────────────

/// Whether the loop ends on its own once the producer finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishPolicy {
    #[default]
    WaitForOperator,
    ExitWhenFinished,
}

/// Why a view loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Confirmed,
    Quit,
    Interrupted,
    Finished,
}

impl LoopExit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Quit => "quit",
            Self::Interrupted => "interrupted",
            Self::Finished => "finished",
        }
    }
}

/// Drive one view until the operator confirms, quits or interrupts, or
/// (with [`FinishPolicy::ExitWhenFinished`]) the producer is done.
///
/// The sink must already be started. Producers are told to stop via
/// [`ViewDesk::cancel`] when this returns.
///
/// # Errors
/// Returns terminal errors from the input source or the sink.
pub fn run_view_loop<V, S, D>(
    desk: &ViewDesk<V>,
    pump: &mut InputPump<S>,
    sink: &mut D,
    policy: FinishPolicy,
) -> Result<LoopExit>
where
    V: View,
    S: ByteSource,
    D: DisplaySink + ?Sized,
{
    let result = drive(desk, pump, sink, policy);
    desk.cancel();
    result
}

fn drive<V, S, D>(
    desk: &ViewDesk<V>,
    pump: &mut InputPump<S>,
    sink: &mut D,
    policy: FinishPolicy,
) -> Result<LoopExit>
where
    V: View,
    S: ByteSource,
    D: DisplaySink + ?Sized,
{
    let kind = desk.inspect(View::kind);
    for failure in pump.signals().registration_failures() {
        sink.record(
            LogEntry::new(EventType::Error, Severity::Warning)
                .with_view(kind.as_str())
                .with_details(failure.as_str()),
        );
    }
    sink.record(LogEntry::new(EventType::ViewChange, Severity::Info).with_view(kind.as_str()));
    render(desk, sink, true)?;

    loop {
        match pump.next_event().map_err(|e| DashError::terminal(&e))? {
            PumpEvent::Key(key) => {
                sink.record(
                    LogEntry::new(EventType::KeyPress, Severity::Debug)
                        .with_view(kind.as_str())
                        .with_key(key.name()),
                );
                let (action, help_toggled) = {
                    let mut view = desk.view.lock();
                    let before = view.help_open();
                    let action = view.handle_input(key);
                    (action, before != view.help_open())
                };
                if help_toggled {
                    let details = if action == ViewAction::Help { "help_open" } else { "help_closed" };
                    sink.record(
                        LogEntry::new(EventType::ViewChange, Severity::Info)
                            .with_view(kind.as_str())
                            .with_details(details),
                    );
                }
                match action {
                    ViewAction::Confirm => return finish_loop(kind, sink, LoopExit::Confirmed),
                    ViewAction::Quit => return finish_loop(kind, sink, LoopExit::Quit),
                    ViewAction::Help | ViewAction::None => render(desk, sink, true)?,
                }
            }
            PumpEvent::Resized => {
                let (width, height) = sink.terminal_size();
                sink.record(
                    LogEntry::new(EventType::Resize, Severity::Info)
                        .with_view(kind.as_str())
                        .with_details(format!("{width}x{height}")),
                );
                render(desk, sink, true)?;
            }
            PumpEvent::Interrupted => {
                sink.record(
                    LogEntry::new(EventType::Interrupt, Severity::Warning).with_view(kind.as_str()),
                );
                return finish_loop(kind, sink, LoopExit::Interrupted);
            }
            PumpEvent::Idle => {}
        }

        let now = Instant::now();
        if desk.is_dirty() || desk.inspect(|v| v.refresh_due(now)) {
            render(desk, sink, false)?;
        }
        if policy == FinishPolicy::ExitWhenFinished && desk.is_finished() {
            render(desk, sink, true)?;
            return finish_loop(kind, sink, LoopExit::Finished);
        }
    }
}

fn finish_loop<D: DisplaySink + ?Sized>(
    kind: ViewKind,
    sink: &mut D,
    exit: LoopExit,
) -> Result<LoopExit> {
    sink.record(
        LogEntry::new(EventType::ViewChange, Severity::Debug)
            .with_view(kind.as_str())
            .with_details(format!("exit={}", exit.as_str())),
    );
    Ok(exit)
}

/// Compose under the view lock, draw outside it. A throttled redraw leaves
/// the desk dirty so the next tick retries.
fn render<V, D>(desk: &ViewDesk<V>, sink: &mut D, force: bool) -> Result<()>
where
    V: View,
    D: DisplaySink + ?Sized,
{
    if !sink.is_running() {
        return Ok(());
    }
    if !force && !sink.throttle_mut().should_refresh(Instant::now()) {
        return Ok(());
    }
    desk.dirty.store(false, Ordering::Release);
    let size = sink.terminal_size();
    let frame = desk.view.lock().compose(size, Moment::now());
    if force {
        sink.force_update(&frame)
    } else {
        sink.update(&frame).map(drop)
    }
}

/// Run `producer` on its own thread while the input loop drives `desk`.
///
/// # Errors
/// Returns loop errors, or [`DashError::Runtime`] if the producer panicked.
pub fn run_with_producer<V, S, D, F>(
    desk: &ViewDesk<V>,
    pump: &mut InputPump<S>,
    sink: &mut D,
    policy: FinishPolicy,
    producer: F,
) -> Result<LoopExit>
where
    V: View + Send,
    S: ByteSource,
    D: DisplaySink + ?Sized,
    F: FnOnce(&ViewDesk<V>) + Send,
{
    std::thread::scope(|scope| {
        let handle = scope.spawn(move || {
            let _finish = FinishOnDrop(desk);
            producer(desk);
        });
        let exit = run_view_loop(desk, pump, sink, policy);
        if handle.join().is_err() {
            return Err(DashError::Runtime {
                details: "event producer panicked".to_string(),
            });
        }
        exit
    })
}

// ──────────────────── flows ────────────────────

/// Interactive multi-select. `None` when the operator quits or interrupts.
/// An empty target list returns an empty selection without drawing.
///
/// # Errors
/// Returns terminal errors from the loop.
pub fn run_selector<R, S, D>(
    targets: Vec<R>,
    page: &PageConfig,
    pump: &mut InputPump<S>,
    sink: &mut D,
) -> Result<Option<Vec<R>>>
where
    R: TargetRow,
    S: ByteSource,
    D: DisplaySink + ?Sized,
{
    if targets.is_empty() {
        return Ok(Some(Vec::new()));
    }
    let desk = ViewDesk::new(SelectorView::new(targets, page));
    match run_view_loop(&desk, pump, sink, FinishPolicy::WaitForOperator)? {
        LoopExit::Confirmed | LoopExit::Finished => Ok(Some(desk.into_inner().into_selected())),
        LoopExit::Quit | LoopExit::Interrupted => Ok(None),
    }
}

/// Live scan fed by `producer`, then selection over whatever was found.
///
/// Ctrl+C in the scanner (or the producer finishing) moves on to the
/// selector; `q` or a process interrupt abandons the run.
///
/// # Errors
/// Returns loop or producer errors.
pub fn run_scan_and_select<R, S, D, F>(
    scanner: ScannerView<R>,
    config: &Config,
    pump: &mut InputPump<S>,
    sink: &mut D,
    producer: F,
) -> Result<Option<Vec<R>>>
where
    R: TargetRow + Send,
    S: ByteSource,
    D: DisplaySink + ?Sized,
    F: FnOnce(&ScanDesk<R>) + Send,
{
    let desk = ViewDesk::new(scanner);
    let exit = run_with_producer(&desk, pump, sink, FinishPolicy::ExitWhenFinished, producer)?;
    match exit {
        LoopExit::Confirmed | LoopExit::Finished => {
            let targets = desk.into_inner().into_targets();
            run_selector(targets, &config.selector, pump, sink)
        }
        LoopExit::Quit | LoopExit::Interrupted => Ok(None),
    }
}

// ──────────────────── recorded producers ────────────────────

/// One line of a recorded JSONL stream: a payload plus the delay before it
/// is delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timed<T> {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub item: T,
}

/// Scan discovery snapshot: the full target list as currently known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSnapshot<R = ScanTarget> {
    pub targets: Vec<R>,
    #[serde(default)]
    pub decloaking: bool,
}

/// Parse a JSONL stream. Blank lines and `#` comments are skipped; line
/// numbers in errors are 1-based.
///
/// # Errors
/// Returns [`DashError::Replay`] for the first unreadable or malformed line.
pub fn parse_jsonl<T, B>(reader: B) -> Result<Vec<Timed<T>>>
where
    T: DeserializeOwned,
    B: BufRead,
{
    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| DashError::Replay {
            line: line_no,
            details: e.to_string(),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let item = serde_json::from_str(trimmed).map_err(|e| DashError::Replay {
            line: line_no,
            details: e.to_string(),
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Deliver `items` to `desk` in order, honouring each delay in `slice`-sized
/// sleeps so a cancelled loop stops the producer promptly. Returns how many
/// items were applied.
pub fn feed<V, T>(
    desk: &ViewDesk<V>,
    items: Vec<Timed<T>>,
    slice: Duration,
    mut apply: impl FnMut(&mut V, T),
) -> usize {
    let slice = slice.max(Duration::from_millis(1));
    let mut applied = 0;
    for Timed { delay_ms, item } in items {
        let mut remaining = Duration::from_millis(delay_ms);
        while !remaining.is_zero() {
            if desk.is_cancelled() {
                return applied;
            }
            let step = remaining.min(slice);
            std::thread::sleep(step);
            remaining -= step;
        }
        if desk.is_cancelled() {
            return applied;
        }
        desk.update(|view| apply(view, item));
        applied += 1;
    }
    desk.finish();
    applied
}

/// Feed recorded attack events, logging the ones the attack kind ignores.
pub fn feed_attack_events<R: TargetRow>(
    desk: &AttackDesk<R>,
    events: Vec<Timed<AttackEvent>>,
    slice: Duration,
) -> usize {
    feed(desk, events, slice, |view, event| {
        let name = event.name();
        if view.handle_event(event, Instant::now()) == EventOutcome::Ignored {
            view.add_log(&format!("ignored {name} event for {}", view.progress().kind()));
        }
    })
}

/// Feed recorded scan snapshots.
pub fn feed_scan_snapshots<R: TargetRow>(
    desk: &ScanDesk<R>,
    snapshots: Vec<Timed<ScanSnapshot<R>>>,
    slice: Duration,
) -> usize {
    feed(desk, snapshots, slice, |view, snapshot| {
        view.update_targets(snapshot.targets, snapshot.decloaking);
    })
}

// ──────────────────── tests ────────────────────
