//! Attack view shared between the input loop and a producer thread.

mod common;

use std::time::{Duration, Instant};

use wardash::core::config::Config;
use wardash::tui::keys::{KeyDecoder, NoInput};
use wardash::tui::progress::{
    AttackDetail, AttackEvent, AttackKind, EventOutcome, MAX_TRACKED_CLIENTS, Milestone,
    ProgressUpdate,
};
use wardash::tui::runtime::{
    AttackDesk, FinishPolicy, InputPump, LoopExit, ViewDesk, feed_attack_events, parse_jsonl,
    run_with_producer,
};
use wardash::tui::signals::SignalFlags;
use wardash::tui::sink::{DisplaySink, MemorySink};
use wardash::tui::views::{AttackView, Moment, View};

fn desk(kind: AttackKind, config: &Config) -> AttackDesk {
    let target = common::targets(1).remove(0);
    ViewDesk::new(AttackView::new(target, kind, config, Instant::now()))
}

fn idle_pump() -> InputPump<NoInput> {
    InputPump::new(
        NoInput,
        KeyDecoder::new(Duration::from_millis(1), Duration::from_millis(1)),
        SignalFlags::detached(),
    )
}

#[test]
fn high_rate_producer_stays_bounded_and_throttled() {
    let config = Config::default();
    let desk = desk(AttackKind::Wpa, &config);
    let mut pump = idle_pump();
    let mut sink = MemorySink::new(100, 40, Duration::from_millis(5));
    sink.start().unwrap();

    let exit = run_with_producer(&desk, &mut pump, &mut sink, FinishPolicy::ExitWhenFinished, |d| {
        for i in 0..2000_u32 {
            d.update_progress(
                ProgressUpdate::new()
                    .progress(f64::from(i) / 2000.0)
                    .status(format!("step {i}"))
                    .metric(format!("m{}", i % 80), i),
            );
            d.add_log(&format!("line {i}"));
        }
    })
    .unwrap();
    assert_eq!(exit, LoopExit::Finished);

    desk.inspect(|view| {
        let progress = view.progress();
        assert_eq!(progress.update_count(), 2000);
        assert!(progress.metrics().len() <= config.attack.metrics_capacity);
        assert!(progress.log().len() <= config.attack.log_capacity);
        assert_eq!(progress.status(), "step 1999");
        // last write for a key wins
        assert_eq!(progress.metrics().get("m79"), Some("1999"));
    });
    assert!(sink.render_count() < 2000);
    assert!(sink.last_frame().unwrap().contains("step 1999"));
}

#[test]
fn evil_twin_milestones_are_strictly_ordered() {
    let config = Config::default();
    let desk = desk(AttackKind::EvilTwin, &config);
    let pause = || std::thread::sleep(Duration::from_millis(5));

    pause();
    desk.apply_event(
        AttackEvent::ClientConnected {
            mac: "AA:BB:CC:00:00:01".into(),
            ip: Some("10.0.0.2".into()),
            hostname: None,
        },
        Instant::now(),
    );
    pause();
    desk.apply_event(
        AttackEvent::CredentialAttempt {
            mac: "AA:BB:CC:00:00:01".into(),
            password: "guess".into(),
            success: false,
        },
        Instant::now(),
    );
    pause();
    let outcome = desk.apply_event(
        AttackEvent::CredentialAttempt {
            mac: "AA:BB:CC:00:00:01".into(),
            password: "letmein1".into(),
            success: true,
        },
        Instant::now(),
    );
    assert_eq!(outcome, EventOutcome::Applied);

    desk.inspect(|view| {
        let p = view.progress();
        let m = p.milestones();
        let client = m.get(Milestone::FirstClient).unwrap();
        let cred = m.get(Milestone::FirstCredential).unwrap();
        let success = m.get(Milestone::Success).unwrap();
        assert!(Duration::ZERO < client && client < cred && cred < success);
        assert!((p.success_rate() - 50.0).abs() < f64::EPSILON);
        let AttackDetail::EvilTwin(detail) = p.detail() else {
            panic!("expected evil twin state");
        };
        assert_eq!(detail.clients.len(), 1);
    });
}

#[test]
fn events_for_another_kind_are_ignored() {
    let config = Config::default();
    let desk = desk(AttackKind::Wps, &config);
    let outcome = desk.apply_event(AttackEvent::Ivs { collected: 10, needed: None }, Instant::now());
    assert_eq!(outcome, EventOutcome::Ignored);
    let applied = desk.apply_event(
        AttackEvent::PinAttempts {
            tried: 1200,
            total: Some(11000),
            current_pin: Some("12345670".into()),
        },
        Instant::now(),
    );
    assert_eq!(applied, EventOutcome::Applied);
    let mut sink = common::started_sink(100, 40);
    let mut pump = common::scripted(b"\x03");
    let exit = wardash::tui::runtime::run_view_loop(&desk, &mut pump, &mut sink, FinishPolicy::WaitForOperator)
        .unwrap();
    assert_eq!(exit, LoopExit::Quit);
    let frame = sink.frames().front().unwrap();
    assert!(frame.contains("12345670") || frame.contains("1,200"), "{}", frame.text());
}

#[test]
fn interrupt_flag_ends_the_attack_loop() {
    let config = Config::default();
    let desk = desk(AttackKind::Pmkid, &config);
    let mut pump = idle_pump();
    let signals = pump.signals().clone();
    let mut sink = common::started_sink(100, 40);
    let exit = run_with_producer(&desk, &mut pump, &mut sink, FinishPolicy::WaitForOperator, |d| {
        d.add_log("waiting for beacon");
        signals.request_interrupt();
    })
    .unwrap();
    assert_eq!(exit, LoopExit::Interrupted);
    assert!(desk.is_cancelled());
}

/// Recorded stream with saturating counts, out-of-range progress and far
/// more log lines, metric names and clients than any window keeps.
fn hostile_stream() -> String {
    let max = u64::MAX;
    let mut lines = vec![
        format!(r#"{{"event":"deauth_sent","count":{max}}}"#),
        format!(r#"{{"event":"deauth_sent","count":{max}}}"#),
        format!(r#"{{"event":"ivs","collected":{max},"needed":0}}"#),
        format!(r#"{{"event":"ivs","collected":{max},"needed":1}}"#),
        format!(r#"{{"event":"crack_attempt","attempt":{}}}"#, u32::MAX),
        format!(r#"{{"event":"pin_attempts","tried":{max},"total":1}}"#),
        format!(r#"{{"event":"progress","progress":1e308,"total_time_secs":{max}}}"#),
        r#"{"event":"progress","progress":-5.0}"#.to_string(),
        format!(
            r#"{{"event":"deauth_status","status":"running","count":{max},"interval_secs":1e308}}"#
        ),
    ];
    for i in 0..600_u32 {
        lines.push(format!(
            r#"{{"event":"client_connected","mac":"02:00:00:00:{:02X}:{:02X}"}}"#,
            i / 256,
            i % 256
        ));
    }
    lines.push(
        r#"{"event":"credential_attempt","mac":"02:00:00:00:00:01","password":"hunter22","success":true}"#
            .to_string(),
    );
    for i in 0..5000_u32 {
        let fraction = f64::from(i) * 3.0 - 7000.0;
        lines.push(format!(
            r#"{{"event":"progress","progress":{fraction},"metrics":[["m{i}","{i}"]]}}"#
        ));
        lines.push(format!(r#"{{"event":"log","message":"line {i}","timestamp":false}}"#));
    }
    lines.join("\n")
}

#[test]
fn hostile_replay_stream_stays_bounded() {
    let config = Config::default();
    let stream = hostile_stream();
    let events: Vec<_> = parse_jsonl::<AttackEvent, _>(stream.as_bytes()).unwrap();
    let expected = events.len();

    for kind in [AttackKind::Wep, AttackKind::Wpa, AttackKind::Wps, AttackKind::EvilTwin] {
        let desk = desk(kind, &config);
        let mut pump = idle_pump();
        let mut sink = MemorySink::new(100, 40, Duration::ZERO).with_history(2, 2);
        sink.start().unwrap();

        let mut applied = 0;
        let batch = events.clone();
        let exit = run_with_producer(&desk, &mut pump, &mut sink, FinishPolicy::ExitWhenFinished, |d| {
            applied = feed_attack_events(d, batch, Duration::from_millis(1));
        })
        .unwrap();
        assert_eq!(exit, LoopExit::Finished, "{kind}");
        assert_eq!(applied, expected, "{kind}");

        desk.inspect(|view| {
            let progress = view.progress();
            assert!((0.0..=1.0).contains(&progress.fraction()), "{kind}: {}", progress.fraction());
            assert!(progress.log().len() <= config.attack.log_capacity, "{kind}");
            assert!(progress.metrics().len() <= config.attack.metrics_capacity, "{kind}");
            match progress.detail() {
                AttackDetail::Wpa(s) => assert_eq!(s.deauths_sent, u64::MAX),
                AttackDetail::EvilTwin(s) => {
                    assert_eq!(s.deauths_sent, u64::MAX);
                    assert_eq!(s.clients.len(), MAX_TRACKED_CLIENTS);
                }
                _ => {}
            }
            assert!(progress.log().iter().all(|line| !line.contains("hunter22")));
        });

        let frame = desk.update(|view| view.compose((100, 40), Moment::now()));
        // metric rows are capped; the log window shrinks to fit what is left
        assert!(frame.lines.len() <= 40 + config.attack.metrics_capacity, "{kind}");
        assert!(frame.contains("line 4999"), "{kind}");
        assert!(sink.frames().len() <= 2);
    }
}
