//! Binary smoke tests. None of these need a terminal.

mod common;

use tempfile::TempDir;

const EVENTS: &str = r#"{"event":"log","message":"capture started","timestamp":false}
{"event":"handshake","captured":false,"clients":2}
{"delay_ms":10,"event":"deauth_sent","count":5}
{"event":"handshake","captured":true}
"#;

fn fixtures() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: wardash [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn config_prints_effective_toml() {
    let dir = fixtures();
    let path = common::write_fixture(dir.path(), "config.toml", "[input]\nescape_timeout_ms = 75\n");
    let result = common::run_cli_case(
        "config_prints_effective_toml",
        &["--config", path.to_str().unwrap(), "config"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("escape_timeout_ms = 75"));
    assert!(result.stdout.contains("[selector]"));
}

#[test]
fn invalid_config_exits_with_user_error() {
    let dir = fixtures();
    let path = common::write_fixture(dir.path(), "config.toml", "[attack]\nlog_capacity = 0\n");
    let result = common::run_cli_case(
        "invalid_config_exits_with_user_error",
        &["--config", path.to_str().unwrap(), "config"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("WD-1001"));
}

#[test]
fn headless_replay_prints_final_frame() {
    let dir = fixtures();
    let events = common::write_fixture(dir.path(), "events.jsonl", EVENTS);
    let target = common::write_fixture(
        dir.path(),
        "target.json",
        r#"{"bssid":"AA:BB:CC:DD:EE:FF","essid":"lab-ap","channel":6,"encryption":"WPA2","power":-48}"#,
    );
    let result = common::run_cli_case(
        "headless_replay_prints_final_frame",
        &[
            "replay",
            events.to_str().unwrap(),
            "--kind",
            "wpa",
            "--target",
            target.to_str().unwrap(),
            "--headless",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Target: lab-ap") || result.stdout.contains("lab-ap"));
    assert!(result.stdout.contains("capture started"));
    assert!(result.stdout.contains("100%"), "log: {}", result.log_path.display());
}

#[test]
fn headless_replay_survives_extreme_values() {
    let dir = fixtures();
    let mut stream = String::from(
        r#"{"event":"deauth_sent","count":18446744073709551615}
{"event":"deauth_sent","count":18446744073709551615}
{"event":"progress","progress":1e308,"total_time_secs":18446744073709551615}
{"event":"progress","progress":-5}
{"event":"credential_attempt","mac":"02:00:00:00:00:01","password":"hunter22","success":true}
"#,
    );
    for i in 0..3000 {
        stream.push_str(&format!("{{\"event\":\"log\",\"message\":\"burst {i}\"}}\n"));
    }
    let events = common::write_fixture(dir.path(), "events.jsonl", &stream);
    let result = common::run_cli_case(
        "headless_replay_survives_extreme_values",
        &["replay", events.to_str().unwrap(), "--kind", "evil-twin", "--headless"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(!result.stderr.contains("panicked"), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("burst 2999"));
    assert!(!result.stdout.contains("hunter22"));
}

#[test]
fn malformed_replay_line_is_reported() {
    let dir = fixtures();
    let events = common::write_fixture(
        dir.path(),
        "events.jsonl",
        "{\"event\":\"ivs\",\"collected\":1}\n{\"event\":\"nope\"}\n",
    );
    let result = common::run_cli_case(
        "malformed_replay_line_is_reported",
        &["replay", events.to_str().unwrap(), "--kind", "wep", "--headless"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("WD-2002"));
    assert!(result.stderr.contains("line 2"));
}

#[test]
fn select_without_terminal_is_refused() {
    let dir = fixtures();
    let targets = common::write_fixture(dir.path(), "targets.json", r#"[{"bssid":"AA:BB:CC:DD:EE:FF"}]"#);
    let result = common::run_cli_case(
        "select_without_terminal_is_refused",
        &["select", targets.to_str().unwrap()],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("terminal"));
}

#[test]
fn completions_are_generated() {
    let result = common::run_cli_case("completions_are_generated", &["completions", "bash"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("wardash"));
}
