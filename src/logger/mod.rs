//! JSONL diagnostics logging for the dashboard.

pub mod jsonl;
