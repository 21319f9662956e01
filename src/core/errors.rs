//! WD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DashError>;

/// Top-level error type for the dashboard engine.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("[WD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[WD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[WD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[WD-2001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[WD-2002] replay input line {line}: {details}")]
    Replay { line: usize, details: String },

    #[error("[WD-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[WD-3101] terminal failure: {details}")]
    Terminal { details: String },

    #[error(
        "[WD-3102] terminal too small: {width}x{height} (minimum {min_width}x{min_height})"
    )]
    TerminalTooSmall {
        width: u16,
        height: u16,
        min_width: u16,
        min_height: u16,
    },

    #[error("[WD-3103] failed to restore terminal mode: {details} (run `reset` to recover the shell)")]
    TerminalRestore { details: String },

    #[error("[WD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DashError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "WD-1001",
            Self::MissingConfig { .. } => "WD-1002",
            Self::ConfigParse { .. } => "WD-1003",
            Self::Serialization { .. } => "WD-2001",
            Self::Replay { .. } => "WD-2002",
            Self::Io { .. } => "WD-3001",
            Self::Terminal { .. } => "WD-3101",
            Self::TerminalTooSmall { .. } => "WD-3102",
            Self::TerminalRestore { .. } => "WD-3103",
            Self::Runtime { .. } => "WD-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Terminal { .. } | Self::TerminalTooSmall { .. }
        )
    }

    /// Whether the operator's shell may be left in a corrupted state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::TerminalRestore { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for terminal-side IO failures.
    #[must_use]
    pub fn terminal(source: &std::io::Error) -> Self {
        Self::Terminal {
            details: source.to_string(),
        }
    }
}

impl From<serde_json::Error> for DashError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DashError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for DashError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
