//! Interactive multi-select over discovered targets.

#![allow(missing_docs)]

use crate::core::config::PageConfig;
use crate::tui::input::{InputContext, ViewAction, ViewKind, resolve_key};
use crate::tui::keys::Key;
use crate::tui::list::{NavigableList, PageBounds};
use crate::tui::sink::Frame;
use crate::tui::views::{
    Moment, ScanTarget, SignalLevel, TargetRow, View, cell, cell_right, essid_cell, help_frame,
};

pub struct SelectorView<R: TargetRow = ScanTarget> {
    list: NavigableList<R>,
    bounds: PageBounds,
    help_open: bool,
}

impl<R: TargetRow> SelectorView<R> {
    /// The initial page size assumes the smallest supported terminal; the
    /// first `compose` refits it to the real height.
    #[must_use]
    pub fn new(targets: Vec<R>, page: &PageConfig) -> Self {
        let bounds = page.bounds();
        Self {
            list: NavigableList::new(targets, bounds.min_rows),
            bounds,
            help_open: false,
        }
    }

    pub const fn list(&self) -> &NavigableList<R> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut NavigableList<R> {
        &mut self.list
    }

    pub fn update_targets(&mut self, targets: Vec<R>) {
        self.list.set_items(targets);
    }

    /// Selected rows in ascending original order.
    pub fn get_selected(&self) -> Vec<&R> {
        self.list.ordered_selected()
    }

    /// Consume the view, keeping only the selected rows.
    pub fn into_selected(self) -> Vec<R> {
        let keep: Vec<usize> = self.list.selected_indices().collect();
        let mut keep = keep.into_iter().peekable();
        self.list
            .into_items()
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| {
                if keep.peek() == Some(&index) {
                    keep.next();
                    Some(row)
                } else {
                    None
                }
            })
            .collect()
    }

    fn row_line(&self, index: usize, row: &R) -> String {
        let cursor = if index == self.list.cursor() { ">" } else { " " };
        let mark = if self.list.is_selected(index) { " ✓" } else { "  " };
        format!(
            "{cursor}{mark} {} {} {} {} {} {} {}",
            cell_right(&(index + 1).to_string(), 4),
            essid_cell(row),
            cell(row.identifier(), 17),
            cell(row.security(), 8),
            cell(SignalLevel::from_dbm(row.signal_dbm()).bars(), 5),
            cell(row.wps().symbol(), 4),
            cell_right(&row.client_count().to_string(), 7)
        )
    }
}

impl<R: TargetRow> View for SelectorView<R> {
    fn kind(&self) -> ViewKind {
        ViewKind::Selector
    }

    fn handle_input(&mut self, key: Key) -> ViewAction {
        let resolution = resolve_key(
            key,
            InputContext {
                view: ViewKind::Selector,
                help_open: self.help_open,
            },
        );
        if resolution.dismiss_help {
            self.help_open = false;
        }
        if let Some(command) = resolution.command {
            command.apply(&mut self.list);
        }
        if resolution.action == ViewAction::Help {
            self.help_open = true;
        }
        resolution.action
    }

    fn help_open(&self) -> bool {
        self.help_open
    }

    fn compose(&mut self, size: (u16, u16), _now: Moment) -> Frame {
        if self.help_open {
            return help_frame(ViewKind::Selector);
        }
        self.list.fit_to_height(size.1, self.bounds);

        let mut frame = Frame::new(format!(
            "Select Targets to Attack ({} selected)",
            self.list.selected_count()
        ));
        frame.push(format!(
            "    {} {} {} {} {} {} {}",
            cell_right("#", 4),
            cell("ESSID", 20),
            cell("BSSID", 17),
            cell("ENC", 8),
            cell("PWR", 5),
            cell("WPS", 4),
            cell_right("CLIENTS", 7)
        ));
        for (index, row) in self.list.visible() {
            frame.push(self.row_line(index, row));
        }

        let above = self.list.scroll_offset() > 0;
        let below = self.list.scroll_offset() + self.list.page_size() < self.list.len();
        match (above, below) {
            (true, true) => frame.push("↑ More above ↓ More below"),
            (true, false) => frame.push("↑ More above"),
            (false, true) => frame.push("↓ More below"),
            (false, false) => {}
        }

        frame.blank();
        frame.push("[↑↓] Navigate  [Space] Select  [Enter] Attack");
        frame.push("[a] All  [n] None  [q] Quit  [?] Help");
        frame
    }
}
