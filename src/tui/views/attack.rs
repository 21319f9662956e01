//! Live attack progress view.
//!
//! Wraps a [`ProgressState`] with the target under attack and optional resume
//! context. The resume fields are re-projected from the session snapshot on
//! every compose.

#![allow(missing_docs)]

use std::time::Instant;

use crate::core::config::Config;
use crate::tui::input::{InputContext, ViewAction, ViewKind, resolve_key};
use crate::tui::keys::Key;
use crate::tui::progress::{AttackEvent, AttackKind, EventOutcome, ProgressState, ProgressUpdate};
use crate::tui::session::{ProgressSummary, SessionProjection, SessionRecord, TargetRecord};
use crate::tui::sink::Frame;
use crate::tui::throttle::RefreshThrottle;
use crate::tui::views::{
    Moment, PROGRESS_BAR_WIDTH, ScanTarget, SignalLevel, TargetRow, View, format_clock, help_frame,
    progress_bar,
};

pub struct AttackView<R: TargetRow = ScanTarget> {
    target: R,
    progress: ProgressState,
    session: Option<SessionRecord>,
    target_record: Option<TargetRecord>,
    log_rows: usize,
    auto_refresh: RefreshThrottle,
    help_open: bool,
}

impl<R: TargetRow> AttackView<R> {
    #[must_use]
    pub fn new(target: R, kind: AttackKind, config: &Config, now: Instant) -> Self {
        Self {
            target,
            progress: ProgressState::new(kind, config.attack.clone(), now),
            session: None,
            target_record: None,
            log_rows: config.display.log_window_rows,
            auto_refresh: RefreshThrottle::new(config.auto_refresh_interval()),
            help_open: false,
        }
    }

    /// Attach resume context. `record` is this target's entry in `session`,
    /// if it has one.
    #[must_use]
    pub fn with_session(mut self, session: SessionRecord, record: Option<TargetRecord>) -> Self {
        self.session = Some(session);
        self.target_record = record;
        self
    }

    pub const fn target(&self) -> &R {
        &self.target
    }

    pub const fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressState {
        &mut self.progress
    }

    /// Restart the attack clock.
    pub fn start(&mut self, now: Instant) {
        self.progress.restart(now);
        self.auto_refresh.reset();
    }

    pub fn update_progress(&mut self, update: ProgressUpdate) {
        self.progress.apply(update);
    }

    pub fn add_log(&mut self, message: &str) {
        self.progress.add_log(message);
    }

    pub fn add_log_raw(&mut self, message: impl Into<String>) {
        self.progress.add_log_raw(message);
    }

    pub fn clear_logs(&mut self) {
        self.progress.clear_logs();
    }

    pub fn handle_event(&mut self, event: AttackEvent, now: Instant) -> EventOutcome {
        self.progress.handle_event(event, now)
    }

    /// Replace the session snapshot; the next compose re-projects from it.
    pub fn refresh_session(&mut self, session: SessionRecord) {
        self.target_record = session.target(self.target.identifier()).cloned();
        self.session = Some(session);
    }

    pub fn get_progress_summary(&self, now: Moment) -> Option<ProgressSummary> {
        self.session.as_ref().map(|s| s.progress_summary(now.wall))
    }

    fn projection(&self, now: Moment) -> Option<SessionProjection> {
        self.session
            .as_ref()
            .map(|s| SessionProjection::compute(s, self.target_record.as_ref(), now.wall))
    }

    fn push_target_info(&self, frame: &mut Frame, projection: Option<&SessionProjection>) {
        let t = &self.target;
        frame.push(format!("ESSID:      {}", t.label().unwrap_or("<hidden>")));
        frame.push(format!("BSSID:      {}", t.identifier()));
        frame.push(format!("Channel:    {}", t.channel()));
        if let Some(p) = projection
            && let Some(attempt) = p.next_attempt_number
        {
            frame.push(format!("Resume:     Attempt #{attempt}"));
            if let Some(last) = p.last_attempt_label() {
                frame.push(format!("Last Try:   {last}"));
            }
        }
        frame.push(format!(
            "Encryption: {}  |  Power: {}",
            t.security(),
            SignalLevel::from_dbm(t.signal_dbm()).bars()
        ));
    }

    fn push_progress(&self, frame: &mut Frame, now: Instant) {
        let p = &self.progress;
        let elapsed = format_clock(p.elapsed(now).as_secs());
        frame.push(format!("Attack:  {}", p.detail().label()));
        match p.total_time() {
            Some(total) => frame.push(format!(
                "Elapsed: {elapsed} / {}",
                format_clock(total.as_secs())
            )),
            None => frame.push(format!("Elapsed: {elapsed}")),
        }
        frame.blank();
        frame.push(format!("Status:  {}", p.status()));
        if !p.metrics().is_empty() {
            frame.blank();
            for (name, value) in p.metrics().iter() {
                frame.push(format!("{name}: {value}"));
            }
        }
        frame.blank();
        frame.push(progress_bar(p.fraction(), PROGRESS_BAR_WIDTH));
    }

    /// Log lines that fit under the rows already in `frame`, capped by the
    /// configured window. At least one line always shows.
    fn log_rows_for(&self, frame: &Frame, height: u16) -> usize {
        // title, logs header, blank, footer
        let reserved = frame.lines.len() + 4;
        usize::from(height)
            .saturating_sub(reserved)
            .clamp(1, self.log_rows.max(1))
    }

    fn push_logs(&self, frame: &mut Frame, rows: usize) {
        frame.push("── Logs ──");
        let log = self.progress.log();
        if log.is_empty() {
            frame.push("No logs yet...");
        }
        for line in log.render_window(rows) {
            frame.push(line);
        }
    }
}

impl<R: TargetRow> View for AttackView<R> {
    fn kind(&self) -> ViewKind {
        ViewKind::Attack
    }

    fn handle_input(&mut self, key: Key) -> ViewAction {
        let resolution = resolve_key(
            key,
            InputContext {
                view: ViewKind::Attack,
                help_open: self.help_open,
            },
        );
        if resolution.dismiss_help {
            self.help_open = false;
        }
        if resolution.action == ViewAction::Help {
            self.help_open = true;
        }
        resolution.action
    }

    fn help_open(&self) -> bool {
        self.help_open
    }

    /// True once the auto-refresh interval has passed since the last compose,
    /// so the elapsed timer keeps ticking without new events.
    fn refresh_due(&self, now: Instant) -> bool {
        self.auto_refresh.should_refresh(now)
    }

    fn compose(&mut self, size: (u16, u16), now: Moment) -> Frame {
        self.auto_refresh.mark(now.at);
        if self.help_open {
            return help_frame(ViewKind::Attack);
        }
        let projection = self.projection(now);
        let essid = self.target.label().unwrap_or("<hidden>");
        let title = if projection.is_some() {
            format!("RESUMED | Target: {essid}")
        } else {
            format!("Target: {essid}")
        };

        let mut frame = Frame::new(title);
        self.push_target_info(&mut frame, projection.as_ref());
        frame.blank();
        self.push_progress(&mut frame, now.at);
        frame.blank();
        let rows = self.log_rows_for(&frame, size.1);
        self.push_logs(&mut frame, rows);
        frame.blank();
        frame.push("[Ctrl+C] Interrupt  |  [?] Help");
        frame
    }
}
