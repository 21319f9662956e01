//! Fixed-capacity FIFO log of display lines.

#![allow(missing_docs)]

use std::collections::VecDeque;

/// Ordered text log that never grows past its capacity.
#[derive(Debug, Clone)]
pub struct BoundedLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl BoundedLog {
    /// `capacity` is floored at 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append, evicting the oldest entries beyond capacity.
    pub fn append(&mut self, entry: impl Into<String>) {
        self.entries.push_back(entry.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Keep only the most recent `keep` entries.
    pub fn trim(&mut self, keep: usize) {
        if self.entries.len() > keep {
            let excess = self.entries.len() - keep;
            self.entries.drain(..excess);
        }
    }

    /// `trim` with the default keep count, the full capacity.
    pub fn trim_to_capacity(&mut self) {
        self.trim(self.capacity);
    }

    /// Most recent `height` entries, oldest first.
    pub fn render_window(&self, height: usize) -> impl Iterator<Item = &str> + '_ {
        let skip = self.entries.len().saturating_sub(height);
        self.entries.iter().skip(skip).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_evicts_oldest() {
        let mut log = BoundedLog::new(10);
        for i in 0..20 {
            log.append(i.to_string());
        }
        assert_eq!(log.len(), 10);
        let kept: Vec<&str> = log.iter().collect();
        let expected: Vec<String> = (10..20).map(|i| i.to_string()).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn trim_keeps_most_recent() {
        let mut log = BoundedLog::new(100);
        for i in 0..30 {
            log.append(format!("line {i}"));
        }
        log.trim(5);
        assert_eq!(log.iter().next(), Some("line 25"));
        assert_eq!(log.len(), 5);
        log.trim(50);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn trim_to_capacity_keeps_full_window() {
        let mut log = BoundedLog::new(4);
        for i in 0..6 {
            log.append(format!("line {i}"));
        }
        log.trim_to_capacity();
        assert_eq!(log.len(), 4);
        assert_eq!(log.iter().next(), Some("line 2"));
        log.trim(1);
        log.trim_to_capacity();
        assert_eq!(log.iter().collect::<Vec<_>>(), vec!["line 5"]);
    }

    #[test]
    fn render_window_is_read_only() {
        let mut log = BoundedLog::new(10);
        log.append("a");
        log.append("b");
        log.append("c");
        assert_eq!(log.render_window(2).collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(log.render_window(10).count(), 3);
        assert_eq!(log.len(), 3);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.render_window(5).count(), 0);
    }

    #[test]
    fn zero_capacity_floors_to_one() {
        let mut log = BoundedLog::new(0);
        log.append("x");
        log.append("y");
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.iter().collect::<Vec<_>>(), vec!["y"]);
    }
}
