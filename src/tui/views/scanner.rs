//! Live scan view: strongest-first top-N table with per-class counts.

#![allow(missing_docs)]

use std::time::Instant;

use crate::core::config::PageConfig;
use crate::tui::input::{InputContext, ViewAction, ViewKind, resolve_key};
use crate::tui::keys::Key;
use crate::tui::list::{NavigableList, PageBounds};
use crate::tui::session::{ProgressSummary, SessionProjection, SessionRecord};
use crate::tui::sink::Frame;
use crate::tui::views::{
    Moment, ScanTarget, SecurityClass, SignalLevel, TargetRow, View, cell, cell_right, essid_cell,
    format_clock, help_frame,
};

/// Targets discovered so far, with optional resume context.
pub struct ScannerView<R: TargetRow = ScanTarget> {
    targets: NavigableList<R>,
    bounds: PageBounds,
    started_at: Instant,
    decloaking: bool,
    session: Option<SessionRecord>,
    help_open: bool,
}

/// Header counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub targets: usize,
    pub wep: usize,
    pub wpa: usize,
    pub wpa3: usize,
    pub wps: usize,
    pub clients: usize,
}

impl<R: TargetRow> ScannerView<R> {
    #[must_use]
    pub fn new(page: &PageConfig, started_at: Instant) -> Self {
        Self {
            targets: NavigableList::default(),
            bounds: page.bounds(),
            started_at,
            decloaking: false,
            session: None,
            help_open: false,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionRecord) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace the discovered targets (the scanner re-reports the full list).
    pub fn update_targets(&mut self, targets: Vec<R>, decloaking: bool) {
        self.targets.set_items(targets);
        self.decloaking = decloaking;
    }

    pub fn targets(&self) -> &[R] {
        self.targets.items()
    }

    /// Hand the discovered targets to the next stage.
    pub fn into_targets(self) -> Vec<R> {
        self.targets.into_items()
    }

    pub fn get_progress_summary(&self, now: Moment) -> Option<ProgressSummary> {
        self.session.as_ref().map(|s| s.progress_summary(now.wall))
    }

    pub fn counts(&self) -> ScanCounts {
        let mut counts = ScanCounts {
            targets: self.targets.len(),
            ..ScanCounts::default()
        };
        for row in self.targets.items() {
            match SecurityClass::classify(row.security()) {
                SecurityClass::Wep => counts.wep += 1,
                SecurityClass::Wpa => counts.wpa += 1,
                SecurityClass::Wpa3 => counts.wpa3 += 1,
                SecurityClass::Open => {}
            }
            if row.wps().is_enabled() {
                counts.wps += 1;
            }
            counts.clients += row.client_count();
        }
        counts
    }

    /// Rows shown for a display `height` rows tall, strongest first, each
    /// paired with its index in the unsorted list.
    pub fn ranked_rows(&self, height: u16) -> Vec<(usize, &R)> {
        let limit = self.bounds.page_size(height);
        self.targets
            .ranked_window(limit, |a, b| a.signal_dbm().cmp(&b.signal_dbm()))
    }

    fn header(&self, now: Moment) -> String {
        let elapsed = now.at.saturating_duration_since(self.started_at).as_secs();
        let mut header = String::from("wardash - ");
        if let Some(session) = &self.session {
            let projection = SessionProjection::compute(session, None, now.wall);
            header.push_str(&format!(
                "RESUMED SESSION - Scanning | Progress: {}/{} | Age: {}",
                projection.summary.completed,
                projection.summary.total,
                projection.summary.age_label()
            ));
        } else {
            header.push_str("Scanning");
        }
        if self.decloaking {
            header.push_str(" & decloaking");
        }
        let c = self.counts();
        header.push_str(&format!(
            " {} | Targets: {} | WEP: {} | WPA: {} | WPA3: {} | WPS: {} | Clients: {}",
            format_clock(elapsed),
            c.targets,
            c.wep,
            c.wpa,
            c.wpa3,
            c.wps,
            c.clients
        ));
        header
    }
}

impl<R: TargetRow> View for ScannerView<R> {
    fn kind(&self) -> ViewKind {
        ViewKind::Scanner
    }

    fn handle_input(&mut self, key: Key) -> ViewAction {
        let resolution = resolve_key(
            key,
            InputContext {
                view: ViewKind::Scanner,
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

    fn compose(&mut self, size: (u16, u16), now: Moment) -> Frame {
        if self.help_open {
            return help_frame(ViewKind::Scanner);
        }
        let (_, height) = size;
        let mut frame = Frame::new(self.header(now));
        frame.push(format!(
            "{} {} {} {} {} {} {} {}",
            cell_right("#", 4),
            cell("ESSID", 20),
            cell("BSSID", 17),
            cell_right("CH", 3),
            cell("PWR", 5),
            cell("ENC", 12),
            cell("WPS", 4),
            cell_right("CLIENTS", 7)
        ));

        let rows = self.ranked_rows(height);
        if rows.is_empty() {
            frame.push("     No targets found yet...");
        }
        for (index, row) in &rows {
            frame.push(format!(
                "{} {} {} {} {} {} {} {}",
                cell_right(&(index + 1).to_string(), 4),
                essid_cell(*row),
                cell(row.identifier(), 17),
                cell_right(&row.channel().to_string(), 3),
                cell(SignalLevel::from_dbm(row.signal_dbm()).bars(), 5),
                cell(row.security(), 12),
                cell(row.wps().symbol(), 4),
                cell_right(&row.client_count().to_string(), 7)
            ));
        }

        let total = self.targets.len();
        if total > rows.len() {
            frame.push(format!(
                "Showing top {} of {total} targets ({} more)",
                rows.len(),
                total - rows.len()
            ));
        }
        frame.blank();
        frame.push("[Ctrl+C] Stop scan and select targets  |  [?] Help");
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::views::WpsStatus;

    fn target(i: usize, power: i32, enc: &str) -> ScanTarget {
        ScanTarget {
            bssid: format!("00:11:22:33:44:{i:02X}"),
            essid: Some(format!("net{i}")),
            channel: 6,
            encryption: enc.to_string(),
            power,
            wps: if i % 2 == 0 { WpsStatus::Unlocked } else { WpsStatus::None },
            clients: 1,
            decloaked: false,
        }
    }

    fn view() -> ScannerView {
        ScannerView::new(&PageConfig::scanner(), Instant::now())
    }

    #[test]
    fn ranks_by_signal_with_original_indices() {
        let mut v = view();
        v.update_targets(
            vec![target(0, -80, "WPA2"), target(1, -30, "WEP"), target(2, -55, "WPA3")],
            false,
        );
        let ranked: Vec<usize> = v.ranked_rows(40).into_iter().map(|(i, _)| i).collect();
        assert_eq!(ranked, vec![1, 2, 0]);

        let frame = v.compose((120, 40), Moment::now());
        let first_row = &frame.lines[1];
        assert!(first_row.trim_start().starts_with("2 "), "{first_row}");
        assert!(first_row.contains("net1"));
    }

    #[test]
    fn header_counts_classes_and_clients() {
        let mut v = view();
        v.update_targets(
            vec![target(0, -80, "WPA2"), target(1, -30, "WEP"), target(2, -55, "WPA3-SAE")],
            true,
        );
        let c = v.counts();
        assert_eq!((c.targets, c.wep, c.wpa, c.wpa3, c.wps, c.clients), (3, 1, 1, 1, 2, 3));
        let frame = v.compose((120, 40), Moment::now());
        assert!(frame.title.contains("Scanning & decloaking"));
        assert!(frame.title.contains("WPA3: 1"));
    }

    #[test]
    fn caption_when_list_exceeds_page() {
        let mut v = view();
        v.update_targets((0..150).map(|i| target(i, -40 - (i as i32 % 50), "WPA2")).collect(), false);
        // 50 rows tall minus 8 reserved = 42 visible
        let frame = v.compose((120, 50), Moment::now());
        assert!(frame.contains("Showing top 42 of 150 targets (108 more)"));
    }

    #[test]
    fn empty_scan_placeholder() {
        let mut v = view();
        let frame = v.compose((120, 40), Moment::now());
        assert!(frame.contains("No targets found yet"));
    }

    #[test]
    fn help_then_dismiss() {
        let mut v = view();
        assert_eq!(v.handle_input(Key::Char('?')), ViewAction::Help);
        assert!(v.help_open());
        assert!(v.compose((120, 40), Moment::now()).contains("Stop scanning"));
        assert_eq!(v.handle_input(Key::Char('x')), ViewAction::None);
        assert!(!v.help_open());
        assert_eq!(v.handle_input(Key::CtrlC), ViewAction::Confirm);
    }
}
