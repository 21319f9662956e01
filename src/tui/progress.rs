//! Live attack-progress state.
//!
//! One [`ProgressState`] per attack view. The attack kind is a tag carried by
//! [`AttackDetail`]; each kind keeps a small sub-state and a builder function
//! that turns it into a [`ProgressUpdate`]. Every update path keeps the log
//! and the metric map bounded, so a multi-hour attack emitting several
//! updates per second holds a fixed amount of memory.

#![allow(missing_docs)]

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::config::AttackConfig;
use crate::tui::bounded_log::BoundedLog;

// ──────────────────── partial updates ────────────────────

/// Partial update from the attack orchestrator. Absent fields leave the
/// current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// `(name, value)` pairs merged in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_secs: Option<u64>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn progress(mut self, fraction: f64) -> Self {
        self.progress = Some(fraction);
        self
    }

    #[must_use]
    pub fn status(mut self, text: impl Into<String>) -> Self {
        self.status = Some(text.into());
        self
    }

    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.metrics.push((name.into(), value.to_string()));
        self
    }

    #[must_use]
    pub const fn total_time(mut self, secs: u64) -> Self {
        self.total_time_secs = Some(secs);
        self
    }
}

// ──────────────────── metric map ────────────────────

/// Insertion-ordered metric map. Re-inserting a key updates its value in
/// place without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricMap {
    entries: Vec<(String, String)>,
}

impl MetricMap {
    pub fn insert(&mut self, name: String, value: String) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Drop the oldest-inserted entries beyond `capacity`.
    pub fn evict_to(&mut self, capacity: usize) {
        if self.entries.len() > capacity {
            let excess = self.entries.len() - capacity;
            self.entries.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ──────────────────── timing milestones ────────────────────

/// One-shot timing milestones, in their required order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    FirstClient,
    FirstCredential,
    Success,
}

impl Milestone {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstClient => "Time to 1st Client",
            Self::FirstCredential => "Time to 1st Cred",
            Self::Success => "Time to Success",
        }
    }
}

/// Elapsed time from attack start to each milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingMilestones {
    first_client: Option<Duration>,
    first_credential: Option<Duration>,
    success: Option<Duration>,
}

impl TimingMilestones {
    /// Set `milestone` to `now - start` unless it is already set or its
    /// predecessor has not been reached. Returns whether it was recorded.
    pub fn record(&mut self, milestone: Milestone, now: Instant, start: Instant) -> bool {
        let predecessor_reached = match milestone {
            Milestone::FirstClient => true,
            Milestone::FirstCredential => self.first_client.is_some(),
            Milestone::Success => self.first_credential.is_some(),
        };
        let slot = self.slot_mut(milestone);
        if slot.is_some() || !predecessor_reached {
            return false;
        }
        *slot = Some(now.saturating_duration_since(start));
        true
    }

    pub const fn get(&self, milestone: Milestone) -> Option<Duration> {
        match milestone {
            Milestone::FirstClient => self.first_client,
            Milestone::FirstCredential => self.first_credential,
            Milestone::Success => self.success,
        }
    }

    fn slot_mut(&mut self, milestone: Milestone) -> &mut Option<Duration> {
        match milestone {
            Milestone::FirstClient => &mut self.first_client,
            Milestone::FirstCredential => &mut self.first_credential,
            Milestone::Success => &mut self.success,
        }
    }

    /// Recorded milestones in order.
    pub fn recorded(&self) -> Vec<(Milestone, Duration)> {
        [Milestone::FirstClient, Milestone::FirstCredential, Milestone::Success]
            .into_iter()
            .filter_map(|m| self.get(m).map(|d| (m, d)))
            .collect()
    }
}

// ──────────────────── attack kinds ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Wep,
    Wpa,
    Wps,
    Pmkid,
    PassivePmkid,
    Wpa3,
    EvilTwin,
}

impl AttackKind {
    pub const ALL: [Self; 7] = [
        Self::Wep,
        Self::Wpa,
        Self::Wps,
        Self::Pmkid,
        Self::PassivePmkid,
        Self::Wpa3,
        Self::EvilTwin,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wep => "wep",
            Self::Wpa => "wpa",
            Self::Wps => "wps",
            Self::Pmkid => "pmkid",
            Self::PassivePmkid => "passive_pmkid",
            Self::Wpa3 => "wpa3",
            Self::EvilTwin => "evil_twin",
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wpa3Strategy {
    Downgrade,
    SaeCapture,
    Passive,
    Dragonblood,
}

impl Wpa3Strategy {
    const fn title(self) -> &'static str {
        match self {
            Self::Downgrade => "Downgrade",
            Self::SaeCapture => "Sae Capture",
            Self::Passive => "Passive",
            Self::Dragonblood => "Dragonblood",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmfStatus {
    Required,
    Optional,
    Disabled,
    #[default]
    Unknown,
}

/// State of an auxiliary service (rogue AP, captive portal, deauth loop).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Paused,
    Stopping,
}

impl ServiceStatus {
    const fn display(self) -> &'static str {
        match self {
            Self::Stopped => "✗ Stopped",
            Self::Starting => "⋯ Starting",
            Self::Running => "✓ Running",
            Self::Paused => "⏸ Paused",
            Self::Stopping => "⋯ Stopping",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvilTwinPhase {
    #[default]
    Initializing,
    CheckingDependencies,
    SettingUp,
    StartingRogueAp,
    StartingNetworkServices,
    StartingCaptivePortal,
    StartingDeauthentication,
    Running,
    Validating,
    Stopping,
    CleaningUp,
    Completed,
    Failed,
}

impl EvilTwinPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::CheckingDependencies => "Checking dependencies",
            Self::SettingUp => "Setting up",
            Self::StartingRogueAp => "Starting rogue AP",
            Self::StartingNetworkServices => "Starting network services",
            Self::StartingCaptivePortal => "Starting captive portal",
            Self::StartingDeauthentication => "Starting deauthentication",
            Self::Running => "Running",
            Self::Validating => "Validating",
            Self::Stopping => "Stopping",
            Self::CleaningUp => "Cleaning up",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    const fn indicator(self) -> &'static str {
        match self {
            Self::Running => "▶",
            Self::Stopping => "⏸",
            Self::Completed => "✓",
            Self::Failed => "✗",
            _ => "⋯",
        }
    }

    /// Status text and progress for phases that do not depend on counters.
    const fn fixed(self) -> Option<(&'static str, f64)> {
        Some(match self {
            Self::Initializing => ("⋯ Initializing Evil Twin attack...", 0.05),
            Self::CheckingDependencies => ("⋯ Checking required dependencies...", 0.10),
            Self::SettingUp => ("⋯ Setting up rogue AP and services...", 0.20),
            Self::StartingRogueAp => ("⋯ Starting rogue access point...", 0.30),
            Self::StartingNetworkServices => ("⋯ Starting DHCP and DNS services...", 0.40),
            Self::StartingCaptivePortal => ("⋯ Starting captive portal...", 0.50),
            Self::StartingDeauthentication => ("⋯ Starting deauthentication...", 0.60),
            Self::Validating => ("⋯ Validating captured credentials...", 0.98),
            Self::Stopping => ("⋯ Stopping attack...", 0.90),
            Self::CleaningUp => ("⋯ Cleaning up resources...", 0.95),
            Self::Completed => ("✓ Attack completed successfully!", 1.0),
            Self::Failed => ("✗ Attack failed", 0.0),
            Self::Running => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum WepPhase {
    #[default]
    Collecting,
    Cracking,
    Cracked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WepState {
    pub ivs_collected: u64,
    pub ivs_needed: u64,
    pub crack_attempts: u32,
    pub replay_active: bool,
    phase: WepPhase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WpaState {
    pub has_handshake: bool,
    pub clients: u32,
    pub deauths_sent: u64,
    pub capture_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WpsState {
    pub pins_tried: u64,
    pub total_pins: u64,
    pub current_pin: Option<String>,
    pub pixie_dust: bool,
    pub pixie_status: Option<String>,
    pub locked_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmkidState {
    pub has_pmkid: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassivePmkidState {
    pub networks: u64,
    pub pmkids: u64,
    pub file_size: u64,
    pub last_extraction: Option<Instant>,
    pub extraction_interval_secs: u64,
    /// Zero means capture until interrupted.
    pub duration_limit_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wpa3State {
    pub strategy: Option<Wpa3Strategy>,
    pub downgrade_attempted: bool,
    pub downgrade_success: bool,
    pub sae_frames: u64,
    pub has_sae_handshake: bool,
    pub pmf: PmfStatus,
    pub transition: bool,
    pub clients: u32,
    pub deauths_sent: u64,
}

/// Connected clients kept per evil-twin run; later MACs are logged but not listed.
pub const MAX_TRACKED_CLIENTS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedClient {
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvilTwinState {
    pub phase: EvilTwinPhase,
    pub rogue_ap: ServiceStatus,
    pub portal: ServiceStatus,
    pub deauth: ServiceStatus,
    pub clients: Vec<ConnectedClient>,
    pub credential_attempts: u64,
    pub deauths_sent: u64,
    pub deauth_interval_secs: Option<f64>,
    pub portal_url: String,
}

/// Per-kind sub-state. The variant is the attack-kind tag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttackDetail {
    Wep(WepState),
    Wpa(WpaState),
    Wps(WpsState),
    Pmkid(PmkidState),
    PassivePmkid(PassivePmkidState),
    Wpa3(Wpa3State),
    EvilTwin(EvilTwinState),
}

impl AttackDetail {
    /// Fresh sub-state with the defaults each tool starts from.
    #[must_use]
    pub fn new(kind: AttackKind) -> Self {
        match kind {
            AttackKind::Wep => Self::Wep(WepState {
                ivs_collected: 0,
                ivs_needed: 10_000,
                crack_attempts: 0,
                replay_active: false,
                phase: WepPhase::default(),
            }),
            AttackKind::Wpa => Self::Wpa(WpaState {
                has_handshake: false,
                clients: 0,
                deauths_sent: 0,
                capture_method: "airodump-ng".to_string(),
            }),
            AttackKind::Wps => Self::Wps(WpsState {
                pins_tried: 0,
                total_pins: 11_000,
                current_pin: None,
                pixie_dust: false,
                pixie_status: None,
                locked_out: false,
            }),
            AttackKind::Pmkid => Self::Pmkid(PmkidState {
                has_pmkid: false,
                attempts: 0,
                max_attempts: 10,
                tool: "hcxdumptool".to_string(),
            }),
            AttackKind::PassivePmkid => Self::PassivePmkid(PassivePmkidState {
                networks: 0,
                pmkids: 0,
                file_size: 0,
                last_extraction: None,
                extraction_interval_secs: 30,
                duration_limit_secs: 0,
            }),
            AttackKind::Wpa3 => Self::Wpa3(Wpa3State {
                strategy: None,
                downgrade_attempted: false,
                downgrade_success: false,
                sae_frames: 0,
                has_sae_handshake: false,
                pmf: PmfStatus::Unknown,
                transition: false,
                clients: 0,
                deauths_sent: 0,
            }),
            AttackKind::EvilTwin => Self::EvilTwin(EvilTwinState {
                phase: EvilTwinPhase::Initializing,
                rogue_ap: ServiceStatus::Stopped,
                portal: ServiceStatus::Stopped,
                deauth: ServiceStatus::Stopped,
                clients: Vec::new(),
                credential_attempts: 0,
                deauths_sent: 0,
                deauth_interval_secs: None,
                portal_url: "http://192.168.100.1".to_string(),
            }),
        }
    }

    pub const fn kind(&self) -> AttackKind {
        match self {
            Self::Wep(_) => AttackKind::Wep,
            Self::Wpa(_) => AttackKind::Wpa,
            Self::Wps(_) => AttackKind::Wps,
            Self::Pmkid(_) => AttackKind::Pmkid,
            Self::PassivePmkid(_) => AttackKind::PassivePmkid,
            Self::Wpa3(_) => AttackKind::Wpa3,
            Self::EvilTwin(_) => AttackKind::EvilTwin,
        }
    }

    /// Human-readable attack label shown in the view title.
    pub fn label(&self) -> String {
        match self {
            Self::Wep(_) => "WEP Attack".to_string(),
            Self::Wpa(_) => "WPA Handshake Capture".to_string(),
            Self::Wps(s) if s.pixie_dust => "WPS Pixie Dust Attack".to_string(),
            Self::Wps(_) => "WPS PIN Attack".to_string(),
            Self::Pmkid(_) => "PMKID Capture".to_string(),
            Self::PassivePmkid(_) => "Passive PMKID Capture".to_string(),
            Self::Wpa3(s) => match s.strategy {
                Some(Wpa3Strategy::Downgrade) => "WPA3 Downgrade Attack".to_string(),
                Some(Wpa3Strategy::SaeCapture) => "WPA3-SAE Handshake Capture".to_string(),
                Some(Wpa3Strategy::Passive) => "WPA3-SAE Passive Capture".to_string(),
                Some(Wpa3Strategy::Dragonblood) => "WPA3 Dragonblood Exploit".to_string(),
                None => "WPA3-SAE Attack".to_string(),
            },
            Self::EvilTwin(_) => "Evil Twin Attack".to_string(),
        }
    }
}

// ──────────────────── discrete events ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedNetwork {
    #[serde(default)]
    pub essid: String,
    pub bssid: String,
}

const fn default_true() -> bool {
    true
}

/// Discrete event stream from the attack orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AttackEvent {
    Progress(ProgressUpdate),
    Log {
        message: String,
        #[serde(default = "default_true")]
        timestamp: bool,
    },
    Ivs {
        collected: u64,
        #[serde(default)]
        needed: Option<u64>,
    },
    CrackAttempt {
        attempt: u32,
        #[serde(default)]
        success: bool,
    },
    ReplayActive {
        active: bool,
    },
    Handshake {
        captured: bool,
        #[serde(default)]
        clients: Option<u32>,
        #[serde(default)]
        deauths_sent: Option<u64>,
    },
    DeauthSent {
        #[serde(default = "one")]
        count: u64,
    },
    PinAttempts {
        tried: u64,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        current_pin: Option<String>,
    },
    PixieDust {
        enabled: bool,
        #[serde(default)]
        status: Option<String>,
    },
    LockedOut {
        locked: bool,
    },
    Pmkid {
        captured: bool,
        #[serde(default)]
        attempts: Option<u32>,
        #[serde(default)]
        max_attempts: Option<u32>,
        #[serde(default)]
        tool: Option<String>,
    },
    PassiveCapture {
        #[serde(default)]
        networks: Option<u64>,
        #[serde(default)]
        pmkids: Option<u64>,
        #[serde(default)]
        file_size: Option<u64>,
        #[serde(default)]
        extracted: bool,
        #[serde(default)]
        duration_limit_secs: Option<u64>,
        #[serde(default)]
        extraction_interval_secs: Option<u64>,
        #[serde(default)]
        captured: Option<CapturedNetwork>,
    },
    Wpa3Strategy {
        strategy: Wpa3Strategy,
    },
    Downgrade {
        attempted: bool,
        #[serde(default)]
        success: bool,
    },
    SaeCapture {
        frames: u64,
        #[serde(default)]
        handshake: bool,
    },
    ClientCount {
        clients: u32,
        #[serde(default)]
        deauths_sent: Option<u64>,
    },
    PmfStatus {
        status: PmfStatus,
        #[serde(default)]
        transition: Option<bool>,
    },
    Phase {
        phase: EvilTwinPhase,
    },
    RogueAp {
        status: ServiceStatus,
        #[serde(default)]
        channel: Option<u8>,
        #[serde(default)]
        ssid: Option<String>,
    },
    Portal {
        status: ServiceStatus,
        #[serde(default)]
        url: Option<String>,
    },
    DeauthStatus {
        status: ServiceStatus,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        interval_secs: Option<f64>,
    },
    ClientConnected {
        mac: String,
        #[serde(default)]
        ip: Option<String>,
        #[serde(default)]
        hostname: Option<String>,
    },
    ClientDisconnected {
        mac: String,
    },
    CredentialAttempt {
        mac: String,
        #[serde(default)]
        password: String,
        success: bool,
    },
}

const fn one() -> u64 {
    1
}

impl AttackEvent {
    /// Wire name of the event, as used in the `event` tag.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Log { .. } => "log",
            Self::Ivs { .. } => "ivs",
            Self::CrackAttempt { .. } => "crack_attempt",
            Self::ReplayActive { .. } => "replay_active",
            Self::Handshake { .. } => "handshake",
            Self::DeauthSent { .. } => "deauth_sent",
            Self::PinAttempts { .. } => "pin_attempts",
            Self::PixieDust { .. } => "pixie_dust",
            Self::LockedOut { .. } => "locked_out",
            Self::Pmkid { .. } => "pmkid",
            Self::PassiveCapture { .. } => "passive_capture",
            Self::Wpa3Strategy { .. } => "wpa3_strategy",
            Self::Downgrade { .. } => "downgrade",
            Self::SaeCapture { .. } => "sae_capture",
            Self::ClientCount { .. } => "client_count",
            Self::PmfStatus { .. } => "pmf_status",
            Self::Phase { .. } => "phase",
            Self::RogueAp { .. } => "rogue_ap",
            Self::Portal { .. } => "portal",
            Self::DeauthStatus { .. } => "deauth_status",
            Self::ClientConnected { .. } => "client_connected",
            Self::ClientDisconnected { .. } => "client_disconnected",
            Self::CredentialAttempt { .. } => "credential_attempt",
        }
    }
}

/// Whether an event was meaningful for the current attack kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Ignored,
}

// ──────────────────── progress state ────────────────────

/// Mutable progress container for one attack view.
#[derive(Debug, Clone)]
pub struct ProgressState {
    detail: AttackDetail,
    progress: f64,
    status: String,
    metrics: MetricMap,
    log: BoundedLog,
    milestones: TimingMilestones,
    successes: u64,
    failures: u64,
    total_time: Option<Duration>,
    started_at: Instant,
    update_count: u64,
    limits: AttackConfig,
}

impl ProgressState {
    #[must_use]
    pub fn new(kind: AttackKind, limits: AttackConfig, started_at: Instant) -> Self {
        Self {
            detail: AttackDetail::new(kind),
            progress: 0.0,
            status: "Initializing...".to_string(),
            metrics: MetricMap::default(),
            log: BoundedLog::new(limits.log_capacity),
            milestones: TimingMilestones::default(),
            successes: 0,
            failures: 0,
            total_time: None,
            started_at,
            update_count: 0,
            limits,
        }
    }

    pub const fn kind(&self) -> AttackKind {
        self.detail.kind()
    }

    pub const fn detail(&self) -> &AttackDetail {
        &self.detail
    }

    pub const fn fraction(&self) -> f64 {
        self.progress
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub const fn metrics(&self) -> &MetricMap {
        &self.metrics
    }

    pub const fn log(&self) -> &BoundedLog {
        &self.log
    }

    pub const fn milestones(&self) -> &TimingMilestones {
        &self.milestones
    }

    pub const fn total_time(&self) -> Option<Duration> {
        self.total_time
    }

    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    pub const fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Reset the attack clock (the view was (re)started).
    pub fn restart(&mut self, now: Instant) {
        self.started_at = now;
    }

    /// Merge a partial update, then keep memory bounded.
    pub fn apply(&mut self, update: ProgressUpdate) {
        if let Some(fraction) = update.progress
            && !fraction.is_nan()
        {
            self.progress = fraction.clamp(0.0, 1.0);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        for (name, value) in update.metrics {
            self.metrics.insert(name, value);
        }
        if let Some(secs) = update.total_time_secs {
            self.total_time = Some(Duration::from_secs(secs));
        }

        self.metrics.evict_to(self.limits.metrics_capacity);
        self.update_count = self.update_count.wrapping_add(1);
        if self.update_count % self.limits.maintenance_period.max(1) == 0 {
            self.maintain();
        }
    }

    /// Periodic cleanup for long-running attacks.
    pub fn maintain(&mut self) {
        self.log.trim(self.limits.log_soft_keep);
        self.metrics.evict_to(self.limits.metrics_capacity);
    }

    /// Append a log line prefixed with the local wall-clock time.
    pub fn add_log(&mut self, message: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.log.append(format!("[{stamp}] {message}"));
    }

    pub fn add_log_raw(&mut self, message: impl Into<String>) {
        self.log.append(message);
    }

    pub fn clear_logs(&mut self) {
        self.log.clear();
    }

    pub fn record_milestone(&mut self, milestone: Milestone, now: Instant) -> bool {
        self.milestones.record(milestone, now, self.started_at)
    }

    pub fn record_attempt(&mut self, success: bool) {
        if success {
            self.successes = self.successes.saturating_add(1);
        } else {
            self.failures = self.failures.saturating_add(1);
        }
    }

    pub const fn successes(&self) -> u64 {
        self.successes
    }

    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// Percentage of successful attempts; `0.0` before any attempt.
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.successes == 0 && self.failures == 0 {
            return 0.0;
        }
        let total = self.successes as f64 + self.failures as f64;
        self.successes as f64 / total * 100.0
    }

    /// Build the update implied by the current sub-state.
    pub fn derive_update(&self, now: Instant) -> ProgressUpdate {
        match &self.detail {
            AttackDetail::Wep(s) => wep_update(s),
            AttackDetail::Wpa(s) => wpa_update(s),
            AttackDetail::Wps(s) => wps_update(s),
            AttackDetail::Pmkid(s) => pmkid_update(s),
            AttackDetail::PassivePmkid(s) => passive_update(s, self.elapsed(now), now),
            AttackDetail::Wpa3(s) => wpa3_update(s),
            AttackDetail::EvilTwin(s) => self.evil_twin_update(s, now),
        }
    }

    /// Apply one orchestrator event. Events that do not belong to this
    /// attack kind leave the state untouched and report `Ignored`.
    pub fn handle_event(&mut self, event: AttackEvent, now: Instant) -> EventOutcome {
        let event = match event {
            AttackEvent::Progress(update) => {
                self.apply(update);
                return EventOutcome::Applied;
            }
            AttackEvent::Log { message, timestamp } => {
                if timestamp {
                    self.add_log(&message);
                } else {
                    self.add_log_raw(message);
                }
                return EventOutcome::Applied;
            }
            other => other,
        };

        let mut logs: Vec<String> = Vec::new();
        let mut attempt: Option<bool> = None;
        let mut milestones: Vec<Milestone> = Vec::new();

        match (&mut self.detail, event) {
            (AttackDetail::Wep(s), AttackEvent::Ivs { collected, needed }) => {
                s.ivs_collected = collected;
                if let Some(needed) = needed {
                    s.ivs_needed = needed;
                }
                if s.phase != WepPhase::Cracked {
                    s.phase = WepPhase::Collecting;
                }
            }
            (AttackDetail::Wep(s), AttackEvent::CrackAttempt { attempt, success }) => {
                s.crack_attempts = attempt;
                s.phase = if success {
                    WepPhase::Cracked
                } else {
                    WepPhase::Cracking
                };
            }
            (AttackDetail::Wep(s), AttackEvent::ReplayActive { active }) => {
                s.replay_active = active;
                if s.phase != WepPhase::Cracked {
                    s.phase = WepPhase::Collecting;
                }
            }

            (
                AttackDetail::Wpa(s),
                AttackEvent::Handshake {
                    captured,
                    clients,
                    deauths_sent,
                },
            ) => {
                s.has_handshake = captured;
                if let Some(clients) = clients {
                    s.clients = clients;
                }
                if let Some(deauths) = deauths_sent {
                    s.deauths_sent = deauths;
                }
            }
            (AttackDetail::Wpa(s), AttackEvent::DeauthSent { count }) => {
                s.deauths_sent = s.deauths_sent.saturating_add(count);
            }
            (AttackDetail::Wpa(s), AttackEvent::ClientCount { clients, deauths_sent }) => {
                s.clients = clients;
                if let Some(deauths) = deauths_sent {
                    s.deauths_sent = deauths;
                }
            }

            (
                AttackDetail::Wps(s),
                AttackEvent::PinAttempts {
                    tried,
                    total,
                    current_pin,
                },
            ) => {
                s.pins_tried = tried;
                if let Some(total) = total {
                    s.total_pins = total;
                }
                if current_pin.is_some() {
                    s.current_pin = current_pin;
                }
            }
            (AttackDetail::Wps(s), AttackEvent::PixieDust { enabled, status }) => {
                s.pixie_dust = enabled;
                s.pixie_status = status;
            }
            (AttackDetail::Wps(s), AttackEvent::LockedOut { locked }) => {
                s.locked_out = locked;
            }

            (
                AttackDetail::Pmkid(s),
                AttackEvent::Pmkid {
                    captured,
                    attempts,
                    max_attempts,
                    tool,
                },
            ) => {
                s.has_pmkid = captured;
                if let Some(attempts) = attempts {
                    s.attempts = attempts;
                }
                if let Some(max) = max_attempts {
                    s.max_attempts = max;
                }
                if let Some(tool) = tool {
                    s.tool = tool;
                }
            }

            (
                AttackDetail::PassivePmkid(s),
                AttackEvent::PassiveCapture {
                    networks,
                    pmkids,
                    file_size,
                    extracted,
                    duration_limit_secs,
                    extraction_interval_secs,
                    captured,
                },
            ) => {
                if let Some(networks) = networks {
                    s.networks = networks;
                }
                if let Some(pmkids) = pmkids {
                    s.pmkids = pmkids;
                }
                if let Some(size) = file_size {
                    s.file_size = size;
                }
                if extracted {
                    s.last_extraction = Some(now);
                }
                if let Some(limit) = duration_limit_secs {
                    s.duration_limit_secs = limit;
                }
                if let Some(interval) = extraction_interval_secs {
                    s.extraction_interval_secs = interval;
                }
                if let Some(network) = captured {
                    s.pmkids = s.pmkids.saturating_add(1);
                    let essid = if network.essid.is_empty() {
                        "<hidden>"
                    } else {
                        network.essid.as_str()
                    };
                    logs.push(format!("✓ PMKID captured: {essid} ({})", network.bssid));
                }
            }

            (AttackDetail::Wpa3(s), AttackEvent::Wpa3Strategy { strategy }) => {
                s.strategy = Some(strategy);
            }
            (AttackDetail::Wpa3(s), AttackEvent::Downgrade { attempted, success }) => {
                s.downgrade_attempted = attempted;
                s.downgrade_success = success;
            }
            (AttackDetail::Wpa3(s), AttackEvent::SaeCapture { frames, handshake }) => {
                s.sae_frames = frames;
                s.has_sae_handshake = handshake;
            }
            (AttackDetail::Wpa3(s), AttackEvent::ClientCount { clients, deauths_sent }) => {
                s.clients = clients;
                if let Some(deauths) = deauths_sent {
                    s.deauths_sent = deauths;
                }
            }
            (AttackDetail::Wpa3(s), AttackEvent::PmfStatus { status, transition }) => {
                s.pmf = status;
                if let Some(transition) = transition {
                    s.transition = transition;
                }
            }
            (AttackDetail::Wpa3(s), AttackEvent::DeauthSent { count }) => {
                s.deauths_sent = s.deauths_sent.saturating_add(count);
            }

            (AttackDetail::EvilTwin(s), AttackEvent::Phase { phase }) => {
                s.phase = phase;
            }
            (
                AttackDetail::EvilTwin(s),
                AttackEvent::RogueAp {
                    status,
                    channel,
                    ssid,
                },
            ) => {
                s.rogue_ap = status;
                if let Some(channel) = channel {
                    self.metrics.insert("AP Channel".to_string(), channel.to_string());
                }
                if let Some(ssid) = ssid {
                    self.metrics.insert("AP SSID".to_string(), ssid);
                }
            }
            (AttackDetail::EvilTwin(s), AttackEvent::Portal { status, url }) => {
                s.portal = status;
                if let Some(url) = url {
                    s.portal_url = url;
                }
            }
            (
                AttackDetail::EvilTwin(s),
                AttackEvent::DeauthStatus {
                    status,
                    count,
                    interval_secs,
                },
            ) => {
                s.deauth = status;
                if let Some(count) = count {
                    s.deauths_sent = count;
                }
                if interval_secs.is_some() {
                    s.deauth_interval_secs = interval_secs;
                }
            }
            (AttackDetail::EvilTwin(s), AttackEvent::DeauthSent { count }) => {
                s.deauths_sent = s.deauths_sent.saturating_add(count);
            }
            (AttackDetail::EvilTwin(s), AttackEvent::ClientConnected { mac, ip, hostname }) => {
                if let Some(existing) = s.clients.iter_mut().find(|c| c.mac == mac) {
                    if ip.is_some() {
                        existing.ip = ip;
                    }
                    if hostname.is_some() {
                        existing.hostname = hostname;
                    }
                } else {
                    logs.push(format!("→ Client connected: {mac}"));
                    if s.clients.len() < MAX_TRACKED_CLIENTS {
                        s.clients.push(ConnectedClient { mac, ip, hostname });
                    }
                    milestones.push(Milestone::FirstClient);
                }
            }
            (AttackDetail::EvilTwin(s), AttackEvent::ClientDisconnected { mac }) => {
                s.clients.retain(|c| c.mac != mac);
                logs.push(format!("← Client disconnected: {mac}"));
            }
            (
                AttackDetail::EvilTwin(s),
                AttackEvent::CredentialAttempt {
                    mac,
                    password,
                    success,
                },
            ) => {
                s.credential_attempts = s.credential_attempts.saturating_add(1);
                milestones.push(Milestone::FirstCredential);
                if success {
                    logs.push(format!("✓ Valid credentials from {mac}: {}", mask_secret(&password)));
                    s.phase = EvilTwinPhase::Validating;
                    milestones.push(Milestone::Success);
                } else {
                    logs.push(format!("✗ Invalid credentials from {mac}"));
                }
                attempt = Some(success);
            }

            _ => return EventOutcome::Ignored,
        }

        if let Some(success) = attempt {
            self.record_attempt(success);
        }
        for line in &logs {
            self.add_log(line);
        }
        for milestone in milestones {
            if self.record_milestone(milestone, now)
                && let Some(elapsed) = self.milestones.get(milestone)
            {
                self.add_log(&format!("{}: {:.1}s", milestone.label(), elapsed.as_secs_f64()));
            }
        }

        let update = self.derive_update(now);
        self.apply(update);
        EventOutcome::Applied
    }

    #[allow(clippy::cast_precision_loss)]
    fn evil_twin_update(&self, s: &EvilTwinState, now: Instant) -> ProgressUpdate {
        let connected = s.clients.len();
        let (status, progress) = match s.phase.fixed() {
            Some((text, fraction)) => (text.to_string(), fraction),
            None if self.successes > 0 => ("✓ Credentials captured! Validating...".to_string(), 0.95),
            None if connected > 0 => (
                format!("⏳ Waiting for credentials from {connected} client(s)..."),
                0.75,
            ),
            None => ("⏳ Waiting for clients to connect...".to_string(), 0.65),
        };

        let mut update = ProgressUpdate::new()
            .progress(progress)
            .status(status)
            .metric("Phase", format!("{} {}", s.phase.indicator(), s.phase.label()))
            .metric("Rogue AP", s.rogue_ap.display())
            .metric("Portal", s.portal.display())
            .metric("Deauth", s.deauth.display())
            .metric("Connected Clients", connected)
            .metric("Credential Attempts", s.credential_attempts);

        if s.credential_attempts > 0 {
            update = update
                .metric(
                    "Successful",
                    format!("{} ({:.0}%)", self.successes, self.success_rate()),
                )
                .metric("Failed", self.failures);
        }

        if matches!(s.deauth, ServiceStatus::Running | ServiceStatus::Paused) {
            let elapsed = self.elapsed(now).as_secs_f64();
            let per_min = if elapsed > 0.0 {
                s.deauths_sent as f64 / elapsed * 60.0
            } else {
                0.0
            };
            update = update.metric(
                "Deauths Sent",
                format!("{} ({per_min:.1}/min)", group_thousands(s.deauths_sent)),
            );
            if let Some(interval) = s.deauth_interval_secs {
                update = update.metric("Deauth Interval", format!("{interval:.1}s (adaptive)"));
            }
        }

        if s.portal == ServiceStatus::Running {
            update = update.metric("Portal URL", &s.portal_url);
        }

        for (milestone, elapsed) in self.milestones.recorded() {
            update = update.metric(milestone.label(), format!("{:.1}s", elapsed.as_secs_f64()));
        }
        update
    }
}

// ──────────────────── per-kind builders ────────────────────

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

const fn check(flag: bool) -> &'static str {
    if flag { "✓" } else { "✗" }
}

fn wep_update(s: &WepState) -> ProgressUpdate {
    let ivs_ratio = ratio(s.ivs_collected, s.ivs_needed);
    match s.phase {
        WepPhase::Cracked => ProgressUpdate::new()
            .progress(1.0)
            .status("Key cracked successfully!")
            .metric("IVs Collected", group_thousands(s.ivs_collected))
            .metric("Crack Attempts", s.crack_attempts)
            .metric("Status", "Success"),
        WepPhase::Cracking => ProgressUpdate::new()
            .progress(ivs_ratio.map_or(0.5, |r| r.min(0.95)))
            .status(format!("Attempting to crack (attempt #{})", s.crack_attempts))
            .metric("IVs Collected", group_thousands(s.ivs_collected))
            .metric("Crack Attempts", s.crack_attempts)
            .metric("Status", "In Progress"),
        WepPhase::Collecting => {
            let mut status = format!(
                "Collecting IVs ({}/{})",
                group_thousands(s.ivs_collected),
                group_thousands(s.ivs_needed)
            );
            if s.replay_active {
                status.push_str(" [Replay active]");
            }
            ProgressUpdate::new()
                .progress(ivs_ratio.map_or(0.0, |r| r.min(1.0)))
                .status(status)
                .metric("IVs Collected", group_thousands(s.ivs_collected))
                .metric("IVs Needed", group_thousands(s.ivs_needed))
                .metric("Crack Attempts", s.crack_attempts)
                .metric("Replay", check(s.replay_active))
        }
    }
}

fn wpa_update(s: &WpaState) -> ProgressUpdate {
    let (status, progress) = if s.has_handshake {
        ("Handshake captured!".to_string(), 1.0)
    } else if s.clients == 0 {
        ("Waiting for clients...".to_string(), 0.2)
    } else if s.deauths_sent > 0 {
        (format!("Deauthing clients (sent {})", s.deauths_sent), 0.6)
    } else {
        ("Monitoring for handshake".to_string(), 0.4)
    };
    ProgressUpdate::new()
        .progress(progress)
        .status(status)
        .metric("Clients", s.clients)
        .metric("Deauths Sent", s.deauths_sent)
        .metric("Handshake", check(s.has_handshake))
        .metric("Method", &s.capture_method)
}

fn wps_update(s: &WpsState) -> ProgressUpdate {
    let (status, progress) = if s.locked_out {
        ("WPS locked out - attack stopped".to_string(), 0.0)
    } else if s.pixie_dust {
        (
            s.pixie_status
                .clone()
                .unwrap_or_else(|| "Pixie Dust attack in progress".to_string()),
            0.5,
        )
    } else {
        (
            format!(
                "Testing PINs ({}/{})",
                group_thousands(s.pins_tried),
                group_thousands(s.total_pins)
            ),
            ratio(s.pins_tried, s.total_pins).unwrap_or(0.0),
        )
    };
    let mut update = ProgressUpdate::new()
        .progress(progress)
        .status(status)
        .metric("PINs Tried", group_thousands(s.pins_tried))
        .metric("Total PINs", group_thousands(s.total_pins))
        .metric(
            "Mode",
            if s.pixie_dust {
                "Pixie Dust"
            } else {
                "PIN Brute Force"
            },
        );
    if let Some(pin) = &s.current_pin {
        update = update.metric("Current PIN", pin);
    }
    if s.locked_out {
        update = update.metric("Status", "Locked Out");
    }
    update
}

fn pmkid_update(s: &PmkidState) -> ProgressUpdate {
    let (status, progress) = if s.has_pmkid {
        ("PMKID captured successfully!".to_string(), 1.0)
    } else if s.attempts >= s.max_attempts {
        (
            format!("Failed to capture PMKID after {} attempts", s.attempts),
            0.0,
        )
    } else {
        (
            format!(
                "Attempting to capture PMKID (attempt {}/{})",
                s.attempts, s.max_attempts
            ),
            ratio(u64::from(s.attempts), u64::from(s.max_attempts)).map_or(0.0, |r| r.min(0.9)),
        )
    };
    ProgressUpdate::new()
        .progress(progress)
        .status(status)
        .metric("Attempts", format!("{}/{}", s.attempts, s.max_attempts))
        .metric("PMKID", check(s.has_pmkid))
        .metric("Tool", &s.tool)
}

fn passive_update(s: &PassivePmkidState, elapsed: Duration, now: Instant) -> ProgressUpdate {
    let elapsed_secs = elapsed.as_secs();
    let progress = if s.duration_limit_secs > 0 {
        ratio(elapsed_secs, s.duration_limit_secs).map_or(0.0, |r| r.min(1.0))
    } else {
        0.5
    };
    let status = if s.pmkids > 0 {
        format!(
            "Capturing PMKIDs passively ({} captured from {} networks)",
            s.pmkids, s.networks
        )
    } else if s.networks > 0 {
        format!("Monitoring {} networks, waiting for PMKIDs...", s.networks)
    } else {
        "Scanning for networks...".to_string()
    };
    let extraction = s.last_extraction.map_or_else(
        || "Never".to_string(),
        |at| format!("{}s ago", now.saturating_duration_since(at).as_secs()),
    );

    let update = ProgressUpdate::new()
        .progress(progress)
        .status(status)
        .metric("Networks Detected", s.networks)
        .metric("PMKIDs Captured", s.pmkids)
        .metric("Capture File Size", format_bytes(s.file_size))
        .metric("Last Extraction", extraction)
        .metric("Extraction Interval", format!("{}s", s.extraction_interval_secs));

    if s.duration_limit_secs > 0 {
        let remaining = s.duration_limit_secs.saturating_sub(elapsed_secs);
        update.metric(
            "Time Remaining",
            format_elapsed(Duration::from_secs(remaining)),
        )
    } else {
        update.metric("Duration", "Infinite")
    }
}

fn wpa3_update(s: &Wpa3State) -> ProgressUpdate {
    let (status, progress) = match s.strategy {
        Some(Wpa3Strategy::Downgrade) if s.downgrade_success => (
            "Downgrade successful! Capturing WPA2 handshake...".to_string(),
            0.7,
        ),
        Some(Wpa3Strategy::Downgrade) if s.downgrade_attempted => (
            "Downgrade failed, falling back to SAE capture".to_string(),
            0.3,
        ),
        Some(Wpa3Strategy::Downgrade) => ("Attempting WPA3 → WPA2 downgrade...".to_string(), 0.2),
        Some(Wpa3Strategy::Passive) if s.has_sae_handshake => {
            ("SAE handshake captured (passive mode)!".to_string(), 1.0)
        }
        Some(Wpa3Strategy::Passive) => (
            "Passive capture (PMF required) - waiting for clients...".to_string(),
            0.4,
        ),
        Some(Wpa3Strategy::Dragonblood) => (
            "Attempting Dragonblood vulnerability exploit...".to_string(),
            0.5,
        ),
        _ if s.has_sae_handshake => ("SAE handshake captured successfully!".to_string(), 1.0),
        _ if s.sae_frames > 0 => (
            format!("Capturing SAE frames ({} captured)...", s.sae_frames),
            0.6,
        ),
        _ if s.clients == 0 => ("Waiting for clients...".to_string(), 0.2),
        _ => ("Monitoring for SAE authentication...".to_string(), 0.4),
    };

    let mut update = ProgressUpdate::new()
        .progress(progress)
        .status(status)
        .metric("Strategy", s.strategy.map_or("Unknown", Wpa3Strategy::title))
        .metric("Clients", s.clients)
        .metric(
            "Mode",
            if s.transition {
                "Transition (WPA2/WPA3)"
            } else {
                "WPA3-Only"
            },
        )
        .metric(
            "PMF",
            match s.pmf {
                PmfStatus::Required => "✓ Required (deauth disabled)",
                PmfStatus::Optional => "~ Optional",
                PmfStatus::Disabled | PmfStatus::Unknown => "✗ Disabled",
            },
        );

    if s.strategy == Some(Wpa3Strategy::Downgrade) || s.downgrade_attempted {
        let downgrade = if s.downgrade_success {
            "✓ Success"
        } else if s.downgrade_attempted {
            "✗ Failed"
        } else {
            "In Progress"
        };
        update = update.metric("Downgrade", downgrade);
    }
    if matches!(
        s.strategy,
        Some(Wpa3Strategy::SaeCapture | Wpa3Strategy::Passive)
    ) || s.sae_frames > 0
    {
        update = update
            .metric("SAE Frames", s.sae_frames)
            .metric("SAE Handshake", check(s.has_sae_handshake));
    }
    if s.pmf != PmfStatus::Required && s.deauths_sent > 0 {
        update = update.metric("Deauths Sent", s.deauths_sent);
    }
    update
}

// ──────────────────── formatting helpers ────────────────────

/// `12345` → `"12,345"`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// First character kept, the rest starred: `"hunter22"` → `"h*******"`.
pub fn mask_secret(secret: &str) -> String {
    let mut chars = secret.chars();
    chars.next().map_or_else(String::new, |first| {
        std::iter::once(first)
            .chain(std::iter::repeat_n('*', chars.count()))
            .collect()
    })
}

/// `"512 bytes"`, `"1.5 KB"`, `"2.0 MB"`.
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

/// `"45s"` below a minute, `"3m 7s"` otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

// ──────────────────── tests ────────────────────
