//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DashError, Result};
use crate::tui::list::PageBounds;

/// Full dashboard configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub display: DisplayConfig,
    pub scanner: PageConfig,
    pub selector: PageConfig,
    pub attack: AttackConfig,
    pub logging: LoggingConfig,
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Keyboard decoding windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    /// How long to wait for the rest of an escape sequence.
    pub escape_timeout_ms: u64,
    /// Length of one blocking read slice; interrupts are observed between slices.
    pub poll_slice_ms: u64,
}

/// Display sink pacing and minimum geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub min_update_interval_ms: u64,
    pub auto_refresh_interval_ms: u64,
    pub min_width: u16,
    pub min_height: u16,
    /// Number of log lines shown in the attack view.
    pub log_window_rows: usize,
}

/// Adaptive page sizing for one list view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PageConfig {
    pub reserved_rows: u16,
    pub min_rows: usize,
    pub max_rows: usize,
}

/// Attack progress memory bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AttackConfig {
    pub log_capacity: usize,
    pub log_soft_keep: usize,
    pub metrics_capacity: usize,
    pub maintenance_period: u64,
}

/// JSONL diagnostics log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub debug: bool,
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            display: DisplayConfig::default(),
            scanner: PageConfig::scanner(),
            selector: PageConfig::selector(),
            attack: AttackConfig::default(),
            logging: LoggingConfig::default(),
            config_file: PathBuf::new(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            escape_timeout_ms: 50,
            poll_slice_ms: 100,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            min_update_interval_ms: 50,
            auto_refresh_interval_ms: 500,
            min_width: 80,
            min_height: 24,
            log_window_rows: 10,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::scanner()
    }
}

impl PageConfig {
    /// Scanner headroom: header (3) + footer (3) + padding (2).
    #[must_use]
    pub const fn scanner() -> Self {
        Self {
            reserved_rows: 8,
            min_rows: 10,
            max_rows: 100,
        }
    }

    /// Selector headroom: header (3) + footer (5) + padding (3).
    #[must_use]
    pub const fn selector() -> Self {
        Self {
            reserved_rows: 11,
            min_rows: 10,
            max_rows: 50,
        }
    }

    #[must_use]
    pub const fn bounds(&self) -> PageBounds {
        PageBounds {
            reserved_rows: self.reserved_rows,
            min_rows: self.min_rows,
            max_rows: self.max_rows,
        }
    }
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            log_capacity: 1000,
            log_soft_keep: 500,
            metrics_capacity: 50,
            maintenance_period: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debug: false,
            path: env::temp_dir().join("wardash.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[WD-CONFIG] WARNING: HOME not set, falling back to /tmp for config path");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        home_dir.join(".config").join("wardash").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| DashError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml_str(&raw)?
        } else if is_explicit_path {
            return Err(DashError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document. Sections left out keep their defaults; keys left
    /// out of `[selector]` fall back to the selector's own bounds.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let document: toml::Table = toml::from_str(raw)?;
        let mut parsed: Self = toml::from_str(raw)?;
        parsed.selector = match document.get("selector") {
            Some(section) => overlay_page(PageConfig::selector(), section)?,
            None => PageConfig::selector(),
        };
        Ok(parsed)
    }

    /// Render the effective config back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    #[must_use]
    pub const fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.input.escape_timeout_ms)
    }

    #[must_use]
    pub const fn poll_slice(&self) -> Duration {
        Duration::from_millis(self.input.poll_slice_ms)
    }

    #[must_use]
    pub const fn min_update_interval(&self) -> Duration {
        Duration::from_millis(self.display.min_update_interval_ms)
    }

    #[must_use]
    pub const fn auto_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.display.auto_refresh_interval_ms)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // input
        set_u64(&mut lookup, "WARDASH_INPUT_ESCAPE_TIMEOUT_MS", &mut self.input.escape_timeout_ms)?;
        set_u64(&mut lookup, "WARDASH_INPUT_POLL_SLICE_MS", &mut self.input.poll_slice_ms)?;

        // display
        set_u64(
            &mut lookup,
            "WARDASH_DISPLAY_MIN_UPDATE_INTERVAL_MS",
            &mut self.display.min_update_interval_ms,
        )?;
        set_u64(
            &mut lookup,
            "WARDASH_DISPLAY_AUTO_REFRESH_INTERVAL_MS",
            &mut self.display.auto_refresh_interval_ms,
        )?;
        set_usize(
            &mut lookup,
            "WARDASH_DISPLAY_LOG_WINDOW_ROWS",
            &mut self.display.log_window_rows,
        )?;

        // list views
        set_usize(&mut lookup, "WARDASH_SCANNER_MAX_ROWS", &mut self.scanner.max_rows)?;
        set_usize(&mut lookup, "WARDASH_SELECTOR_MAX_ROWS", &mut self.selector.max_rows)?;

        // attack
        set_usize(&mut lookup, "WARDASH_ATTACK_LOG_CAPACITY", &mut self.attack.log_capacity)?;
        set_usize(&mut lookup, "WARDASH_ATTACK_LOG_SOFT_KEEP", &mut self.attack.log_soft_keep)?;
        set_usize(
            &mut lookup,
            "WARDASH_ATTACK_METRICS_CAPACITY",
            &mut self.attack.metrics_capacity,
        )?;
        set_u64(
            &mut lookup,
            "WARDASH_ATTACK_MAINTENANCE_PERIOD",
            &mut self.attack.maintenance_period,
        )?;

        // logging
        if let Some(raw) = lookup("WARDASH_LOG_ENABLED") {
            self.logging.enabled = parse_env_bool("WARDASH_LOG_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("WARDASH_LOG_DEBUG") {
            self.logging.debug = parse_env_bool("WARDASH_LOG_DEBUG", &raw)?;
        }
        if let Some(raw) = lookup("WARDASH_LOG_PATH") {
            self.logging.path = PathBuf::from(raw);
            self.logging.enabled = true;
        }

        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.input.escape_timeout_ms == 0 || self.input.poll_slice_ms == 0 {
            return Err(DashError::InvalidConfig {
                details: "input timeouts must be > 0 ms".to_string(),
            });
        }

        for (name, page) in [("scanner", &self.scanner), ("selector", &self.selector)] {
            if page.min_rows == 0 {
                return Err(DashError::InvalidConfig {
                    details: format!("{name}.min_rows must be >= 1"),
                });
            }
            if page.min_rows > page.max_rows {
                return Err(DashError::InvalidConfig {
                    details: format!(
                        "{name}.min_rows ({}) must be <= {name}.max_rows ({})",
                        page.min_rows, page.max_rows
                    ),
                });
            }
        }

        let attack = &self.attack;
        if attack.log_capacity == 0 || attack.metrics_capacity == 0 || attack.maintenance_period == 0
        {
            return Err(DashError::InvalidConfig {
                details: "attack capacities and maintenance_period must be >= 1".to_string(),
            });
        }
        if attack.log_soft_keep > attack.log_capacity {
            return Err(DashError::InvalidConfig {
                details: format!(
                    "attack.log_soft_keep ({}) must be <= attack.log_capacity ({})",
                    attack.log_soft_keep, attack.log_capacity
                ),
            });
        }

        if self.display.log_window_rows == 0 {
            return Err(DashError::InvalidConfig {
                details: "display.log_window_rows must be >= 1".to_string(),
            });
        }

        Ok(())
    }
}

fn overlay_page(base: PageConfig, section: &toml::Value) -> Result<PageConfig> {
    let mut merged = toml::Value::try_from(base)?;
    if let (Some(target), Some(source)) = (merged.as_table_mut(), section.as_table()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(merged.try_into()?)
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_u64<F>(lookup: &mut F, name: &str, slot: &mut u64) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse::<u64>().map_err(|error| DashError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_usize<F>(lookup: &mut F, name: &str, slot: &mut usize) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .trim()
            .parse::<usize>()
            .map_err(|error| DashError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| DashError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{Config, DashError, PageConfig};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.selector, PageConfig::selector());
        assert_eq!(cfg.scanner, PageConfig::scanner());
    }

    #[test]
    fn partial_toml_keeps_section_defaults() {
        let cfg = Config::from_toml_str(
            r"
            [attack]
            log_capacity = 200
            log_soft_keep = 100
            ",
        )
        .expect("parse");
        assert_eq!(cfg.attack.log_capacity, 200);
        assert_eq!(cfg.attack.metrics_capacity, 50);
        assert_eq!(cfg.selector.max_rows, 50);
        assert_eq!(cfg.scanner.max_rows, 100);
        assert_eq!(cfg.input.escape_timeout_ms, 50);
    }

    #[test]
    fn partial_selector_section_keeps_selector_bounds() {
        let cfg = Config::from_toml_str("[selector]\nmax_rows = 40\n").expect("parse");
        assert_eq!(cfg.selector.max_rows, 40);
        assert_eq!(cfg.selector.reserved_rows, 11);
        assert_eq!(cfg.scanner.reserved_rows, 8);
    }

    #[test]
    fn toml_round_trips_effective_config() {
        let cfg = Config::default();
        let rendered = cfg.to_toml_string().expect("render");
        let parsed = Config::from_toml_str(&rendered).expect("parse");
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn soft_keep_above_capacity_rejected() {
        let mut cfg = Config::default();
        cfg.attack.log_soft_keep = cfg.attack.log_capacity + 1;
        let err = cfg.validate().expect_err("expected validation error");
        assert!(err.to_string().contains("log_soft_keep"));
    }

    #[test]
    fn inverted_page_bounds_rejected() {
        let mut cfg = Config::default();
        cfg.selector.min_rows = 60;
        let err = cfg.validate().expect_err("expected validation error");
        match err {
            DashError::InvalidConfig { details } => assert!(details.contains("selector.min_rows")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg = Config::default();
        cfg.input.escape_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("WARDASH_INPUT_ESCAPE_TIMEOUT_MS", "75"),
            ("WARDASH_ATTACK_METRICS_CAPACITY", "20"),
            ("WARDASH_LOG_PATH", "/tmp/wardash-test.jsonl"),
        ]);

        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("env overrides should parse");

        assert_eq!(cfg.input.escape_timeout_ms, 75);
        assert_eq!(cfg.attack.metrics_capacity, 20);
        assert!(cfg.logging.enabled);
        assert_eq!(cfg.logging.path, PathBuf::from("/tmp/wardash-test.jsonl"));
    }

    #[test]
    fn env_invalid_number_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("WARDASH_ATTACK_LOG_CAPACITY", "lots")]);

        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid number should fail");
        match err {
            DashError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("WARDASH_ATTACK_LOG_CAPACITY"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_invalid_boolean_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("WARDASH_LOG_DEBUG", "sometimes")]);
        assert!(
            cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
                .is_err()
        );
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let result = Config::load(Some(Path::new("/nonexistent/wardash/config.toml")));
        let err = result.expect_err("missing explicit path");
        assert!(matches!(err, DashError::MissingConfig { .. }));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[display]\nmin_update_interval_ms = 20\n").expect("write");

        let cfg = Config::load(Some(&path)).expect("load");
        assert_eq!(cfg.display.min_update_interval_ms, 20);
        assert_eq!(cfg.config_file, path);
    }

    #[test]
    fn stable_hash_deterministic_and_sensitive() {
        let cfg = Config::default();
        let h1 = cfg.stable_hash().expect("hash");
        let h2 = cfg.stable_hash().expect("hash");
        assert_eq!(h1, h2);

        let mut modified = Config::default();
        modified.attack.log_capacity += 1;
        assert_ne!(h1, modified.stable_hash().expect("hash"));
    }
}
