//! Resume context read from a saved session file.

mod common;

use std::time::Instant;

use chrono::{TimeZone, Utc};

use wardash::core::config::Config;
use wardash::tui::progress::AttackKind;
use wardash::tui::session::{SessionProjection, SessionRecord};
use wardash::tui::views::{AttackView, Moment, ScannerView, View};

const SESSION: &str = r#"{
    "session_id": "20260301_120000",
    "created_at": 1772366400.0,
    "targets": [
        {"bssid": "02:00:00:00:00:00", "essid": "net-0", "attempts": 2, "last_attempt": 1772370000.5},
        {"bssid": "02:00:00:00:00:01", "essid": "net-1"},
        {"bssid": "02:00:00:00:00:02", "essid": "net-2", "status": "completed"}
    ],
    "completed_targets": ["02:00:00:00:00:02"],
    "failed_targets": {"02:00:00:00:00:01": "timeout"}
}"#;

fn load() -> SessionRecord {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_fixture(dir.path(), "session.json", SESSION);
    SessionRecord::load(&path).unwrap()
}

fn moment_at(hours_after_start: i64) -> Moment {
    Moment {
        at: Instant::now(),
        wall: Utc.timestamp_opt(1_772_366_400 + hours_after_start * 3600, 0).unwrap(),
    }
}

#[test]
fn projection_counts_and_attempts() {
    let session = load();
    let record = session.target("02:00:00:00:00:00").cloned();
    let projection = SessionProjection::compute(&session, record.as_ref(), moment_at(5).wall);
    assert_eq!(projection.summary.total, 3);
    assert_eq!(projection.summary.completed, 1);
    assert_eq!(projection.summary.failed, 1);
    assert_eq!(projection.summary.remaining, 2);
    assert_eq!(projection.summary.age_label(), "5h");
    assert_eq!(projection.next_attempt_number, Some(3));
    assert!(projection.time_since_last_attempt.is_some());

    // the source record is untouched
    assert_eq!(session.target("02:00:00:00:00:00").unwrap().attempts, 2);
}

#[test]
fn bssid_lookup_ignores_case() {
    let session = load();
    assert!(session.target("02:00:00:00:00:0A").is_none());
    assert!(session.target("02:00:00:00:00:00").is_some());
    assert_eq!(
        session.target("02:00:00:00:00:00"),
        session.target(&"02:00:00:00:00:00".to_lowercase())
    );
}

#[test]
fn attack_view_shows_resume_fields() {
    let session = load();
    let record = session.target("02:00:00:00:00:00").cloned();
    let config = Config::default();
    let target = common::targets(1).remove(0);
    let mut view = AttackView::new(target, AttackKind::Wpa, &config, Instant::now())
        .with_session(session, record);
    let frame = view.compose((100, 40), moment_at(30));
    assert!(frame.title.starts_with("RESUMED"), "{}", frame.title);
    assert!(frame.contains("Resume:     Attempt #3"));
    assert!(frame.contains("Last Try:"));
    let summary = view.get_progress_summary(moment_at(30)).unwrap();
    assert_eq!(summary.age_label(), "1d");
}

#[test]
fn scanner_header_shows_session_progress() {
    let config = Config::default();
    let mut scanner = ScannerView::new(&config.scanner, Instant::now()).with_session(load());
    scanner.update_targets(common::targets(3), false);
    let frame = scanner.compose((120, 40), moment_at(0));
    assert!(frame.title.contains("RESUMED SESSION"));
    assert!(frame.title.contains("Progress: 1/3"));
    assert!(frame.title.contains("Age: 0m"));
}

#[test]
fn missing_session_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SessionRecord::load(&dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.code(), "WD-3001");
}
