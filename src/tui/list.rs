//! Cursor, scroll window and multi-selection over an ordered list.
//!
//! Only rows inside `[scroll_offset, scroll_offset + page_size)` are handed
//! out for formatting, so lists with thousands of rows stay cheap to draw.
//! Ranked "top-N" windows are computed over a sorted copy of references, but
//! every index reported back is an index into the unsorted backing list.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Rows moved by Page Up / Page Down.
pub const PAGE_JUMP: isize = 10;

/// Per-view page sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    /// Rows taken by header, footer and padding.
    pub reserved_rows: u16,
    pub min_rows: usize,
    pub max_rows: usize,
}

impl PageBounds {
    #[must_use]
    pub fn page_size(&self, display_height: u16) -> usize {
        page_size_for(display_height, self.reserved_rows, self.min_rows, self.max_rows)
    }
}

/// `clamp(display_height - reserved_rows, min_rows, max_rows)`, with the
/// subtraction saturating at zero.
///
/// `max_rows` wins if the bounds are inverted.
#[must_use]
pub fn page_size_for(display_height: u16, reserved_rows: u16, min_rows: usize, max_rows: usize) -> usize {
    let available = usize::from(display_height.saturating_sub(reserved_rows));
    available.max(min_rows).min(max_rows)
}

/// Navigable list state.
#[derive(Debug, Clone)]
pub struct NavigableList<T> {
    items: Vec<T>,
    cursor: usize,
    scroll_offset: usize,
    selected: BTreeSet<usize>,
    page_size: usize,
}

impl<T> Default for NavigableList<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 1)
    }
}

impl<T> NavigableList<T> {
    /// `page_size` is floored at 1.
    #[must_use]
    pub fn new(items: Vec<T>, page_size: usize) -> Self {
        Self {
            items,
            cursor: 0,
            scroll_offset: 0,
            selected: BTreeSet::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub const fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Row under the cursor.
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.cursor)
    }

    // ──────────────────── navigation ────────────────────

    /// Move by `delta` rows, clamped to the list. No-op on an empty list.
    pub fn move_cursor(&mut self, delta: isize) {
        let Some(last) = self.items.len().checked_sub(1) else {
            return;
        };
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        self.adjust_scroll();
    }

    pub fn page_down(&mut self) {
        self.move_cursor(PAGE_JUMP);
    }

    pub fn page_up(&mut self) {
        self.move_cursor(-PAGE_JUMP);
    }

    pub fn home(&mut self) {
        self.cursor = 0;
        self.adjust_scroll();
    }

    pub fn end(&mut self) {
        self.cursor = self.items.len().saturating_sub(1);
        self.adjust_scroll();
    }

    /// Minimal scroll so the cursor is inside the window.
    pub fn adjust_scroll(&mut self) {
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + self.page_size {
            self.scroll_offset = self.cursor + 1 - self.page_size;
        }
    }

    // ──────────────────── selection ────────────────────

    /// Flip membership of `index`. Out-of-range indices are ignored.
    pub fn toggle_selection(&mut self, index: usize) {
        if index >= self.items.len() {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    pub fn toggle_cursor(&mut self) {
        self.toggle_selection(self.cursor);
    }

    pub fn select_all(&mut self) {
        self.selected = (0..self.items.len()).collect();
    }

    pub fn select_none(&mut self) {
        self.selected.clear();
    }

    /// Selected indices, ascending.
    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Selected rows in ascending original-index order.
    pub fn ordered_selected(&self) -> Vec<&T> {
        self.selected
            .iter()
            .filter_map(|&index| self.items.get(index))
            .collect()
    }

    // ──────────────────── updates ────────────────────

    /// Replace the backing rows; cursor and selection are clamped to the new length.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        let len = self.items.len();
        self.selected.retain(|&index| index < len);
        self.cursor = self.cursor.min(len.saturating_sub(1));
        self.scroll_offset = self.scroll_offset.min(self.cursor);
        self.adjust_scroll();
    }

    /// Resize the window (e.g. after a terminal resize). Floored at 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.adjust_scroll();
    }

    /// Recompute the page size from the display height.
    pub fn fit_to_height(&mut self, display_height: u16, bounds: PageBounds) {
        self.set_page_size(bounds.page_size(display_height));
    }

    // ──────────────────── display windows ────────────────────

    /// Rows currently on screen with their indices.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(self.page_size)
    }

    /// Top `limit` rows by `compare`, greatest first, paired with their
    /// original indices. Ties keep list order. The list itself is not touched.
    pub fn ranked_window<F>(&self, limit: usize, mut compare: F) -> Vec<(usize, &T)>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut ranked: Vec<(usize, &T)> = self.items.iter().enumerate().collect();
        ranked.sort_by(|a, b| compare(b.1, a.1));
        ranked.truncate(limit);
        ranked
    }
}

// ──────────────────── tests ────────────────────
