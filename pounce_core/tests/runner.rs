use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pounce_core::mocks::MemorySink;
use pounce_core::telemetry::{TelemetrySample, TelemetrySink};
use pounce_core::{AbortReason, ManeuverError, PhaseCfg, Timeouts, runner};
use pounce_traits::clock::Clock;
use pounce_traits::clock::testing::TestClock;
use pounce_traits::{Command, Phase, Servo, ServoState};
use rstest::rstest;

fn reference_cfg() -> PhaseCfg {
    PhaseCfg {
        t_begin: 0.4,
        t_reset: 0.8,
        pd_begin: 2.0,
        pd_target: 2.5,
        feedforward_torque: 1.5,
        kp_scale: 1.0,
        kd_scale: 1.0,
        maximum_torque: 1.5,
        reset_torque: 0.2,
        termination_time: 1.2,
    }
}

/// Scripted plant: reported position ramps linearly with the shared test
/// clock, capped at `cap`. Every exchange consumes one simulated round trip,
/// which is the only thing advancing time.
struct RampServo {
    clock: TestClock,
    epoch: Instant,
    rate_rev_per_s: f64,
    cap_rev: f64,
    round_trip: Duration,
    stops: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<Command>>>,
}

impl RampServo {
    fn new(clock: TestClock, rate_rev_per_s: f64) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            rate_rev_per_s,
            cap_rev: 3.0,
            round_trip: Duration::from_micros(2_500),
            stops: Arc::new(AtomicUsize::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Servo for RampServo {
    fn stop(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn send_command(
        &mut self,
        cmd: &Command,
        _timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn Error + Send + Sync>> {
        self.commands.lock().unwrap().push(*cmd);
        self.clock.advance(self.round_trip);
        let t = self.clock.secs_since(self.epoch);
        let position = (self.rate_rev_per_s * t).min(self.cap_rev);
        Ok(cmd.query.then(|| ServoState {
            position,
            velocity: Some(self.rate_rev_per_s),
            torque: None,
        }))
    }
}

/// Derive the phase from the shape of an issued command.
fn classify(cmd: &Command, cfg: &PhaseCfg) -> Phase {
    match cmd.position {
        None => Phase::Push,
        Some(p) if p == cfg.pd_target => Phase::Settle,
        Some(_) if cmd.maximum_torque == cfg.reset_torque => Phase::Reset,
        Some(_) => Phase::HoldZero,
    }
}

#[test]
fn reference_plant_walks_hold_push_reset() {
    let cfg = reference_cfg();
    let clock = TestClock::new();
    // 0 -> 3.0 rev over 1.2 s: position tracks 2.5 * elapsed exactly, so the
    // threshold and the reset boundary coincide and the settle phase is
    // empty by construction.
    let servo = RampServo::new(clock.clone(), 2.5);
    let stops = servo.stops.clone();
    let commands = servo.commands.clone();
    let mut sink = MemorySink::new();

    let report = runner::run(
        servo,
        &mut sink,
        cfg,
        Timeouts::default(),
        None,
        Some(Box::new(clock)),
    )
    .expect("run should complete");

    // 2.5 ms per iteration: the first elapsed strictly past 1.2 s is
    // 1.2025 s on iteration 482. The 1.2 s sample itself still runs.
    assert_eq!(report.iterations, 482);
    assert!(report.elapsed_s > 1.2);
    assert_eq!(report.final_position, 3.0);
    assert_eq!(report.samples_flushed, report.iterations);
    assert!(report.dt_filtered_s > 0.002 && report.dt_filtered_s < 0.0026);

    // One flush, every sample, in order.
    let samples = sink.only_flush().expect("exactly one flush");
    assert_eq!(samples.len(), report.iterations);
    assert!(samples.windows(2).all(|w| w[0].elapsed_s < w[1].elapsed_s));
    assert!(samples[samples.len() - 2].elapsed_s <= 1.2);
    assert!(samples[samples.len() - 1].elapsed_s > 1.2);

    // Initial fault-clear stop plus the final cleanup stop.
    assert_eq!(stops.load(Ordering::SeqCst), 2);

    let commands = commands.lock().unwrap();
    assert_eq!(commands.len(), report.iterations);
    let phases: Vec<Phase> = commands.iter().map(|c| classify(c, &cfg)).collect();
    assert!(phases.windows(2).all(|w| w[0] <= w[1]), "phases regressed");
    assert!(!phases.contains(&Phase::Settle));
    assert_eq!(phases.iter().filter(|p| **p == Phase::HoldZero).count(), 160);
    assert_eq!(phases.iter().filter(|p| **p == Phase::Push).count(), 160);
    assert_eq!(phases.iter().filter(|p| **p == Phase::Reset).count(), 162);

    for (phase, sample) in phases.iter().zip(samples) {
        match phase {
            Phase::HoldZero => assert!(sample.elapsed_s < 0.4),
            Phase::Push => assert!((0.4..0.8).contains(&sample.elapsed_s)),
            Phase::Reset => assert!(sample.elapsed_s >= 0.8),
            Phase::Settle => unreachable!(),
        }
    }
}

#[test]
fn fast_plant_walks_all_four_phases() {
    let cfg = reference_cfg();
    let clock = TestClock::new();
    // 0 -> 3.0 rev over 1.0 s: the threshold is crossed before t_reset, so
    // the settle phase gets real iterations before the reset takes over.
    let servo = RampServo::new(clock.clone(), 3.0);
    let commands = servo.commands.clone();
    let mut sink = MemorySink::new();

    let report = runner::run(
        servo,
        &mut sink,
        cfg,
        Timeouts::default(),
        None,
        Some(Box::new(clock)),
    )
    .expect("run should complete");

    let commands = commands.lock().unwrap();
    let phases: Vec<Phase> = commands.iter().map(|c| classify(c, &cfg)).collect();
    assert!(phases.windows(2).all(|w| w[0] <= w[1]), "phases regressed");
    for expected in [Phase::HoldZero, Phase::Push, Phase::Settle, Phase::Reset] {
        assert!(phases.contains(&expected), "missing {expected:?}");
    }

    let samples = sink.only_flush().expect("exactly one flush");
    assert_eq!(samples.len(), report.iterations);
    for (i, phase) in phases.iter().enumerate() {
        match phase {
            Phase::Settle => {
                assert!(samples[i].elapsed_s < 0.8);
                assert_eq!(commands[i].position, Some(2.5));
                assert_eq!(commands[i].maximum_torque, 1.5);
            }
            Phase::Reset => assert!(samples[i].elapsed_s >= 0.8),
            _ => {}
        }
    }
}

// ── Cleanup contract ─────────────────────────────────────────────────────────

type EventLog = Arc<Mutex<Vec<&'static str>>>;

/// Servo whose exchange fails on the n-th call (1-based).
struct FailingServo {
    fail_on: usize,
    message: &'static str,
    calls: usize,
    events: EventLog,
}

impl Servo for FailingServo {
    fn stop(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push("stop");
        Ok(())
    }

    fn send_command(
        &mut self,
        cmd: &Command,
        _timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn Error + Send + Sync>> {
        self.calls += 1;
        if self.calls >= self.fail_on {
            return Err(Box::new(std::io::Error::other(self.message)));
        }
        Ok(cmd.query.then(|| ServoState {
            position: 0.01 * self.calls as f64,
            velocity: None,
            torque: None,
        }))
    }
}

/// Sink that records flushes into the shared event log.
struct LoggingSink {
    events: EventLog,
    flushed: Vec<Vec<TelemetrySample>>,
}

impl TelemetrySink for LoggingSink {
    fn flush(
        &mut self,
        samples: &[TelemetrySample],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push("flush");
        self.flushed.push(samples.to_vec());
        Ok(())
    }
}

#[rstest]
#[case(1)]
#[case(4)]
#[case(25)]
fn failure_on_iteration_k_still_stops_and_flushes_k_minus_1_samples(#[case] k: usize) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let servo = FailingServo {
        fail_on: k,
        message: "connection lost",
        calls: 0,
        events: events.clone(),
    };
    let mut sink = LoggingSink {
        events: events.clone(),
        flushed: Vec::new(),
    };

    let err = runner::run(servo, &mut sink, reference_cfg(), Timeouts::default(), None, None)
        .expect_err("exchange failure must surface");

    match err.downcast_ref::<ManeuverError>() {
        Some(ManeuverError::Servo(msg)) => assert!(msg.contains("connection lost")),
        other => panic!("expected Servo error, got {other:?}"),
    }

    assert_eq!(sink.flushed.len(), 1, "flush must happen exactly once");
    assert_eq!(sink.flushed[0].len(), k - 1);

    // Fault-clear stop, then on failure the final stop, then the one flush.
    let events = events.lock().unwrap();
    assert_eq!(events.as_slice(), ["stop", "stop", "flush"]);
}

#[test]
fn timeout_shaped_failures_map_to_the_timeout_error() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let servo = FailingServo {
        fail_on: 3,
        message: "request timeout after 100ms",
        calls: 0,
        events: events.clone(),
    };
    let mut sink = LoggingSink {
        events,
        flushed: Vec::new(),
    };

    let err = runner::run(servo, &mut sink, reference_cfg(), Timeouts::default(), None, None)
        .expect_err("timeout must surface");

    match err.downcast_ref::<ManeuverError>() {
        Some(ManeuverError::Timeout) => {}
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(sink.flushed.len(), 1);
    assert_eq!(sink.flushed[0].len(), 2);
}

#[test]
fn interrupt_aborts_with_best_effort_stop_and_single_flush() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let servo = FailingServo {
        fail_on: usize::MAX,
        message: "unused",
        calls: 0,
        events: events.clone(),
    };
    let mut sink = LoggingSink {
        events: events.clone(),
        flushed: Vec::new(),
    };

    // The shutdown flag trips on the sixth poll, so five iterations record.
    let polls = AtomicUsize::new(0);
    let shutdown = move || polls.fetch_add(1, Ordering::SeqCst) >= 5;

    let err = runner::run(
        servo,
        &mut sink,
        reference_cfg(),
        Timeouts::default(),
        Some(Box::new(shutdown)),
        None,
    )
    .expect_err("interrupt must abort the run");

    match err.downcast_ref::<ManeuverError>() {
        Some(ManeuverError::Abort(AbortReason::Interrupted)) => {}
        other => panic!("expected Abort(Interrupted), got {other:?}"),
    }

    assert_eq!(sink.flushed.len(), 1);
    assert_eq!(sink.flushed[0].len(), 5);
    // Fault-clear, best-effort stop on the interrupt, final cleanup stop.
    let events = events.lock().unwrap();
    assert_eq!(events.as_slice(), ["stop", "stop", "stop", "flush"]);
}

/// Servo whose stop always fails; exchanges never happen.
struct StopFailServo;

impl Servo for StopFailServo {
    fn stop(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("bus unreachable")))
    }

    fn send_command(
        &mut self,
        _cmd: &Command,
        _timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn Error + Send + Sync>> {
        unreachable!("begin must fail before any exchange")
    }
}

#[test]
fn failed_fault_clear_still_flushes_an_empty_run() {
    let mut sink = MemorySink::new();
    let err = runner::run(
        StopFailServo,
        &mut sink,
        reference_cfg(),
        Timeouts::default(),
        None,
        None,
    )
    .expect_err("failed initial stop must surface");

    assert!(format!("{err:#}").contains("clearing servo state"));
    let samples = sink.only_flush().expect("exactly one flush");
    assert!(samples.is_empty());
}

/// Sink that always fails to flush.
struct BrokenSink;

impl TelemetrySink for BrokenSink {
    fn flush(
        &mut self,
        _samples: &[TelemetrySample],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("disk full")))
    }
}

#[test]
fn flush_failure_after_clean_run_surfaces_as_telemetry_error() {
    let clock = TestClock::new();
    let servo = RampServo::new(clock.clone(), 2.5);
    let stops = servo.stops.clone();

    let err = runner::run(
        servo,
        &mut BrokenSink,
        reference_cfg(),
        Timeouts::default(),
        None,
        Some(Box::new(clock)),
    )
    .expect_err("flush failure must surface");

    match err.downcast_ref::<ManeuverError>() {
        Some(ManeuverError::Telemetry(msg)) => assert!(msg.contains("disk full")),
        other => panic!("expected Telemetry error, got {other:?}"),
    }
    // The stop still ran before the flush was attempted.
    assert_eq!(stops.load(Ordering::SeqCst), 2);
}
