//! Top-level CLI definition and dispatch.

use std::fs::{self, File};
use std::io::{self, BufReader, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use serde_json::{Value, json};
use thiserror::Error;

use wardash::core::config::Config;
use wardash::core::errors::DashError;
use wardash::tui::keys::NoInput;
use wardash::tui::progress::{AttackEvent, AttackKind};
use wardash::tui::runtime::{
    AttackDesk, FinishPolicy, InputPump, LoopExit, ScanSnapshot, Timed, ViewDesk,
    feed_attack_events, feed_scan_snapshots, parse_jsonl, run_with_producer,
};
use wardash::tui::session::SessionRecord;
use wardash::tui::signals::SignalFlags;
use wardash::tui::sink::{DisplaySink, MemorySink};
use wardash::tui::views::{AttackView, ScanTarget, ScannerView};

/// Headless replays render at this geometry.
const HEADLESS_SIZE: (u16, u16) = (100, 40);

/// wardash - terminal dashboard for wireless audit runs.
#[derive(Debug, Parser)]
#[command(
    name = "wardash",
    author,
    version,
    about = "Terminal dashboard for wireless audit runs",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write JSONL diagnostics to this file.
    #[arg(long, global = true, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Include debug diagnostics (key presses, renders).
    #[arg(long, global = true)]
    debug: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Pick targets interactively from a JSON array of scan rows.
    Select(SelectArgs),
    /// Replay recorded scan snapshots, then select from what was found.
    Scan(ScanArgs),
    /// Replay recorded attack events into the attack view.
    Replay(ReplayArgs),
    /// Print the effective configuration as TOML.
    Config,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct SelectArgs {
    /// JSON file holding an array of targets.
    #[arg(value_name = "TARGETS")]
    targets: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// JSONL file of `{delay_ms, targets, decloaking}` snapshots.
    #[arg(value_name = "SNAPSHOTS")]
    snapshots: PathBuf,
    /// Session record to show resume progress from.
    #[arg(long, value_name = "PATH")]
    session: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// JSONL file of attack events, each with an optional `delay_ms`.
    #[arg(value_name = "EVENTS")]
    events: PathBuf,
    /// Attack kind the events belong to.
    #[arg(long, value_enum)]
    kind: AttackKind,
    /// JSON file describing the target.
    #[arg(long, value_name = "PATH")]
    target: Option<PathBuf>,
    /// Session record for resume context.
    #[arg(long, value_name = "PATH")]
    session: Option<PathBuf>,
    /// BSSID of the target inside the session record.
    #[arg(long, value_name = "BSSID", requires = "session")]
    bssid: Option<String>,
    /// Render into memory and print the final frame instead of taking the terminal.
    #[arg(long)]
    headless: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// The operator quit or interrupted before confirming.
    #[error("{0}")]
    Cancelled(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Cancelled(_) => 130,
        }
    }
}

impl From<DashError> for CliError {
    fn from(err: DashError) -> Self {
        match err {
            DashError::InvalidConfig { .. }
            | DashError::MissingConfig { .. }
            | DashError::ConfigParse { .. }
            | DashError::Replay { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Select(args) => run_select(cli, args),
        Command::Scan(args) => run_scan(cli, args),
        Command::Replay(args) => run_replay(cli, args),
        Command::Config => {
            let config = load_config(cli)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.log {
        config.logging.enabled = true;
        config.logging.path.clone_from(path);
    }
    if cli.debug {
        config.logging.enabled = true;
        config.logging.debug = true;
    }
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T, CliError> {
    let raw = fs::read_to_string(path).map_err(|e| DashError::io(path, e))?;
    serde_json::from_str(&raw)
        .map_err(|e| CliError::User(format!("invalid {what} in {}: {e}", path.display())))
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<Timed<T>>, CliError> {
    let file = File::open(path).map_err(|e| DashError::io(path, e))?;
    Ok(parse_jsonl(BufReader::new(file))?)
}

fn run_select(cli: &Cli, args: &SelectArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let targets: Vec<ScanTarget> = read_json(&args.targets, "target list")?;
    let selected = interactive(&config, |pump, sink| {
        wardash::tui::runtime::run_selector(targets, &config.selector, pump, sink)
    })?;
    emit_selection(selected)
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let snapshots: Vec<Timed<ScanSnapshot>> = read_jsonl(&args.snapshots)?;
    let mut scanner = ScannerView::new(&config.scanner, Instant::now());
    if let Some(path) = &args.session {
        scanner = scanner.with_session(SessionRecord::load(path)?);
    }
    let slice = config.poll_slice();
    let selected = interactive(&config, |pump, sink| {
        wardash::tui::runtime::run_scan_and_select(scanner, &config, pump, sink, |desk| {
            feed_scan_snapshots(desk, snapshots, slice);
        })
    })?;
    emit_selection(selected)
}

fn emit_selection(selected: Option<Vec<ScanTarget>>) -> Result<(), CliError> {
    match selected {
        Some(rows) => {
            let payload = serde_json::to_value(rows)?;
            write_json_line(&payload)
        }
        None => Err(CliError::Cancelled("selection cancelled".to_string())),
    }
}

fn run_replay(cli: &Cli, args: &ReplayArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let events: Vec<Timed<AttackEvent>> = read_jsonl(&args.events)?;
    let total = events.len();

    let session = args.session.as_deref().map(SessionRecord::load).transpose()?;
    let record = match (&session, &args.bssid) {
        (Some(s), Some(bssid)) => s.target(bssid).cloned(),
        _ => None,
    };
    let target = match &args.target {
        Some(path) => read_json(path, "target")?,
        None => placeholder_target(args.bssid.as_deref()),
    };

    let mut view = AttackView::new(target, args.kind, &config, Instant::now());
    if let Some(session) = session {
        view = view.with_session(session, record);
    }
    let desk: AttackDesk = ViewDesk::new(view);
    let slice = config.poll_slice();
    let mut applied = 0;
    let producer = |d: &AttackDesk| applied = feed_attack_events(d, events, slice);

    if args.headless {
        let mut sink = MemorySink::new(HEADLESS_SIZE.0, HEADLESS_SIZE.1, config.min_update_interval())
            .with_history(1, 0);
        sink.start()?;
        let signals = SignalFlags::register();
        for failure in signals.registration_failures() {
            eprintln!("{failure}");
        }
        let mut pump = InputPump::from_config(NoInput, &config, signals);
        let exit = run_with_producer(&desk, &mut pump, &mut sink, FinishPolicy::ExitWhenFinished, producer)?;
        sink.stop()?;
        if let Some(frame) = sink.last_frame() {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", frame.text())?;
        }
        return match exit {
            LoopExit::Interrupted => Err(CliError::Cancelled("replay interrupted".to_string())),
            _ => Ok(()),
        };
    }

    let exit = interactive(&config, |pump, sink| {
        run_with_producer(&desk, pump, sink, FinishPolicy::WaitForOperator, producer)
    })?;
    let payload = json!({
        "command": "replay",
        "kind": args.kind.as_str(),
        "exit": exit.as_str(),
        "events_applied": applied,
        "events_total": total,
    });
    write_json_line(&payload)
}

fn placeholder_target(bssid: Option<&str>) -> ScanTarget {
    ScanTarget {
        bssid: bssid.unwrap_or("00:00:00:00:00:00").to_string(),
        essid: None,
        channel: 0,
        encryption: String::new(),
        power: 0,
        wps: wardash::tui::views::WpsStatus::None,
        clients: 0,
        decloaked: false,
    }
}

/// Run `body` with the terminal in raw mode and the alternate screen up.
///
/// The terminal is restored before any result is returned; a failed
/// restore takes precedence over every other error.
#[cfg(unix)]
fn interactive<T>(
    config: &Config,
    body: impl FnOnce(
        &mut InputPump<wardash::tui::keys::StdinBytes>,
        &mut wardash::tui::sink::TerminalController<io::Stdout>,
    ) -> wardash::core::errors::Result<T>,
) -> Result<T, CliError> {
    use wardash::tui::keys::StdinBytes;
    use wardash::tui::sink::TerminalController;
    use wardash::tui::terminal_guard::RawModeGuard;

    if !io::stdin().is_terminal() {
        return Err(CliError::User(
            "interactive mode needs a terminal on stdin (use --headless for replays)".to_string(),
        ));
    }
    let signals = SignalFlags::register();
    let guard = RawModeGuard::terminal()?;
    let mut sink = TerminalController::stdout(config);
    let outcome = sink.start().and_then(|()| {
        let mut pump = InputPump::from_config(StdinBytes::new(), config, signals);
        body(&mut pump, &mut sink)
    });
    let stopped = sink.stop();
    drop(sink);
    guard.release()?;
    let value = outcome?;
    stopped?;
    Ok(value)
}

#[cfg(not(unix))]
fn interactive<T>(
    _config: &Config,
    _body: impl FnOnce(&mut InputPump<NoInput>, &mut MemorySink) -> wardash::core::errors::Result<T>,
) -> Result<T, CliError> {
    Err(CliError::User(
        "interactive mode is only supported on unix terminals".to_string(),
    ))
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}
