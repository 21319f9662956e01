//! Read-only projection of a saved scan/attack session for resume display.
//!
//! Session files are produced elsewhere; this module only reads them. Times
//! are stored as fractional Unix seconds.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{DashError, Result};

/// Per-target record from a saved session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub bssid: String,
    #[serde(default)]
    pub essid: Option<String>,
    #[serde(default)]
    pub channel: u16,
    #[serde(default)]
    pub encryption: String,
    #[serde(default)]
    pub power: i32,
    #[serde(default)]
    pub wps: bool,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, with = "epoch_seconds::option")]
    pub last_attempt: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "pending".to_string()
}

/// Saved session as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(with = "epoch_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "epoch_seconds::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub targets: Vec<TargetRecord>,
    /// BSSIDs.
    #[serde(default)]
    pub completed_targets: Vec<String>,
    /// BSSID → failure reason.
    #[serde(default)]
    pub failed_targets: std::collections::BTreeMap<String, String>,
}

impl SessionRecord {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| DashError::io(path, source))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn target(&self, bssid: &str) -> Option<&TargetRecord> {
        self.targets
            .iter()
            .find(|t| t.bssid.eq_ignore_ascii_case(bssid))
    }

    /// Counts and age as of `now`.
    #[must_use]
    pub fn progress_summary(&self, now: DateTime<Utc>) -> ProgressSummary {
        let total = self.targets.len();
        let completed = self.completed_targets.len();
        let age = elapsed_since(self.created_at, now);
        ProgressSummary {
            total,
            completed,
            failed: self.failed_targets.len(),
            remaining: total.saturating_sub(completed),
            age_hours: age.as_secs_f64() / 3600.0,
        }
    }
}

/// Session-level counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub remaining: usize,
    pub age_hours: f64,
}

impl ProgressSummary {
    /// `"45m"`, `"5h"`, `"3d"`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn age_label(&self) -> String {
        let hours = self.age_hours.max(0.0);
        if hours < 1.0 {
            format!("{}m", (hours * 60.0) as u64)
        } else if hours < 24.0 {
            format!("{}h", hours as u64)
        } else {
            format!("{}d", (hours / 24.0) as u64)
        }
    }
}

/// Resume fields derived from a session snapshot and, optionally, the
/// record for the target under attack. Recompute on each render.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProjection {
    pub summary: ProgressSummary,
    pub age: Duration,
    pub next_attempt_number: Option<u32>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub time_since_last_attempt: Option<Duration>,
}

impl SessionProjection {
    #[must_use]
    pub fn compute(
        session: &SessionRecord,
        target: Option<&TargetRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        let last_attempt_at = target.and_then(|t| t.last_attempt);
        Self {
            summary: session.progress_summary(now),
            age: elapsed_since(session.created_at, now),
            next_attempt_number: target.map(|t| t.attempts.saturating_add(1)),
            last_attempt_at,
            time_since_last_attempt: last_attempt_at.map(|at| elapsed_since(at, now)),
        }
    }

    /// Local wall-clock time of the previous attempt, if any.
    pub fn last_attempt_label(&self) -> Option<String> {
        self.last_attempt_at.map(|at| {
            at.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
    }
}

/// `now - then`, zero if `then` lies in the future.
fn elapsed_since(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - then).to_std().unwrap_or(Duration::ZERO)
}

/// Serde adapter: `DateTime<Utc>` as fractional Unix seconds.
mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[allow(clippy::cast_precision_loss)]
    pub fn to_secs(at: &DateTime<Utc>) -> f64 {
        at.timestamp_micros() as f64 / 1_000_000.0
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn from_secs<E: de::Error>(secs: f64) -> Result<DateTime<Utc>, E> {
        if !secs.is_finite() {
            return Err(E::custom("timestamp is not finite"));
        }
        DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
            .ok_or_else(|| E::custom(format!("timestamp out of range: {secs}")))
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(to_secs(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        from_secs(f64::deserialize(deserializer)?)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            at: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => serializer.serialize_some(&super::to_secs(at)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<f64>::deserialize(deserializer)?
                .map(super::from_secs::<D::Error>)
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    const SESSION_JSON: &str = r#"{
        "session_id": "session_20250101_120000",
        "created_at": 1735732800.0,
        "updated_at": 1735736400.5,
        "config": {"interface": "wlan0mon"},
        "targets": [
            {"bssid": "AA:BB:CC:DD:EE:01", "essid": "CoffeeShop", "channel": 6,
             "encryption": "WPA2", "power": -48, "wps": true, "status": "completed",
             "attempts": 1, "last_attempt": 1735733000.0},
            {"bssid": "AA:BB:CC:DD:EE:02", "essid": null, "channel": 11,
             "encryption": "WPA2", "power": -71, "wps": false, "status": "in_progress",
             "attempts": 2, "last_attempt": 1735735000.0},
            {"bssid": "AA:BB:CC:DD:EE:03", "essid": "Lab", "channel": 1,
             "encryption": "WEP", "power": -80, "wps": false}
        ],
        "completed_targets": ["AA:BB:CC:DD:EE:01"],
        "failed_targets": {"AA:BB:CC:DD:EE:04": "timeout"}
    }"#;

    fn session() -> SessionRecord {
        serde_json::from_str(SESSION_JSON).unwrap()
    }

    #[test]
    fn parses_fractional_epoch_and_defaults() {
        let s = session();
        assert_eq!(s.created_at.timestamp(), 1_735_732_800);
        assert_eq!(s.targets[2].status, "pending");
        assert_eq!(s.targets[2].attempts, 0);
        assert!(s.targets[2].last_attempt.is_none());
        assert!(s.target("aa:bb:cc:dd:ee:02").is_some());
    }

    #[test]
    fn projection_for_resumed_target() {
        let s = session();
        let now = s.created_at + TimeDelta::hours(3);
        let target = s.target("AA:BB:CC:DD:EE:02");
        let p = SessionProjection::compute(&s, target, now);

        assert_eq!(p.summary.total, 3);
        assert_eq!(p.summary.completed, 1);
        assert_eq!(p.summary.remaining, 2);
        assert_eq!(p.summary.failed, 1);
        assert!((p.summary.age_hours - 3.0).abs() < 1e-9);
        assert_eq!(p.age, Duration::from_secs(3 * 3600));
        assert_eq!(p.next_attempt_number, Some(3));
        assert_eq!(
            p.time_since_last_attempt,
            Some(Duration::from_secs(1_735_732_800 + 3 * 3600 - 1_735_735_000))
        );
        assert!(p.last_attempt_label().is_some());
    }

    #[test]
    fn projection_without_prior_attempt() {
        let s = session();
        let p = SessionProjection::compute(&s, s.target("AA:BB:CC:DD:EE:03"), s.created_at);
        assert_eq!(p.next_attempt_number, Some(1));
        assert!(p.time_since_last_attempt.is_none());
        assert!(p.last_attempt_label().is_none());

        let none = SessionProjection::compute(&s, None, s.created_at);
        assert_eq!(none.next_attempt_number, None);
    }

    #[test]
    fn projection_does_not_mutate_source() {
        let s = session();
        let before = s.clone();
        let _ = SessionProjection::compute(&s, s.target("AA:BB:CC:DD:EE:01"), Utc::now());
        assert_eq!(s, before);
    }

    #[test]
    fn clock_skew_gives_zero_age() {
        let s = session();
        let p = SessionProjection::compute(&s, None, s.created_at - TimeDelta::minutes(5));
        assert_eq!(p.age, Duration::ZERO);
    }

    #[test]
    fn age_labels() {
        let mut summary = session().progress_summary(Utc::now());
        summary.age_hours = 0.75;
        assert_eq!(summary.age_label(), "45m");
        summary.age_hours = 5.5;
        assert_eq!(summary.age_label(), "5h");
        summary.age_hours = 80.0;
        assert_eq!(summary.age_label(), "3d");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SessionRecord::load(Path::new("/nonexistent/wardash/session.json"))
            .expect_err("missing file");
        assert_eq!(err.code(), "WD-3001");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, SESSION_JSON).unwrap();
        assert_eq!(SessionRecord::load(&path).unwrap(), session());
    }
}
