#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use wardash::tui::keys::{KeyDecoder, ScriptedBytes};
use wardash::tui::runtime::InputPump;
use wardash::tui::signals::SignalFlags;
use wardash::tui::sink::{DisplaySink, MemorySink};
use wardash::tui::views::{ScanTarget, WpsStatus};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_wardash") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "wardash.exe" } else { "wardash" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve wardash binary path for integration test"),
    }
}

/// Run the binary with stdin detached, keeping a transcript for failures.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("wardash-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute wardash command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

/// `n` distinct targets with descending signal.
pub fn targets(n: usize) -> Vec<ScanTarget> {
    (0..n)
        .map(|i| ScanTarget {
            bssid: format!("02:00:00:00:{:02X}:{:02X}", i / 256, i % 256),
            essid: Some(format!("net-{i}")),
            channel: u16::try_from(i % 13 + 1).unwrap_or(1),
            encryption: if i % 3 == 0 { "WPA2" } else { "WPA3" }.to_string(),
            power: -30 - i32::try_from(i % 60).unwrap_or(0),
            wps: if i % 4 == 0 { WpsStatus::Unlocked } else { WpsStatus::None },
            clients: u32::try_from(i % 5).unwrap_or(0),
            decloaked: false,
        })
        .collect()
}

/// Pump over a byte script with 1 ms escape and poll slices.
pub fn scripted(bytes: &[u8]) -> InputPump<ScriptedBytes> {
    InputPump::new(
        ScriptedBytes::new(bytes),
        KeyDecoder::new(Duration::from_millis(1), Duration::from_millis(1)),
        SignalFlags::detached(),
    )
}

pub fn started_sink(width: u16, height: u16) -> MemorySink {
    let mut sink = MemorySink::new(width, height, Duration::ZERO);
    sink.start().expect("start memory sink");
    sink
}
