//! Subcommand implementations: wiring config, servo, and the maneuver engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use tracing::debug;

use crate::cli::{CliManeuver, JSON_MODE, LAST_MANEUVER, RunArgs};
use pounce_config::{Config, SimCfg};
use pounce_core::servo_error::map_servo_error;
use pounce_core::{PhaseCfg, TelemetrySample, TelemetrySink, Timeouts, runner};
use pounce_hardware::{SimParams, SimulatedServo};
use pounce_traits::{Command, Servo};

pub fn json_mode() -> bool {
    *JSON_MODE.get().unwrap_or(&false)
}

/// Read, parse, and validate the TOML config at `path`.
pub fn load_config(path: &Path) -> eyre::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = pounce_config::load_toml(&raw)
        .wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn sim_params(cfg: &SimCfg) -> SimParams {
    SimParams {
        latency: Duration::from_micros(cfg.latency_us),
        torque_gain: cfg.torque_gain,
        track_tau_s: cfg.track_tau_s,
    }
}

/// Sink that writes the full run as one JSON array of samples.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TelemetrySink for JsonFileSink {
    fn flush(
        &mut self,
        samples: &[TelemetrySample],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<serde_json::Value> = samples
            .iter()
            .map(|s| {
                serde_json::json!({
                    "elapsed_s": s.elapsed_s,
                    "position": s.state.position,
                    "velocity": s.state.velocity,
                    "torque": s.state.torque,
                })
            })
            .collect();
        let buf = serde_json::to_vec(&rows)?;
        std::fs::write(&self.path, buf)?;
        debug!(path = %self.path.display(), samples = samples.len(), "telemetry written");
        Ok(())
    }
}

/// Config-file maneuver parameters with CLI overrides applied on top.
fn effective_phase_cfg(cfg: &Config, args: &RunArgs) -> PhaseCfg {
    let mut p = PhaseCfg::from(&cfg.maneuver);
    if let Some(v) = args.t_begin {
        p.t_begin = v;
    }
    if let Some(v) = args.t_reset {
        p.t_reset = v;
    }
    if let Some(v) = args.pd_begin {
        p.pd_begin = v;
    }
    if let Some(v) = args.pd_target {
        p.pd_target = v;
    }
    if let Some(v) = args.feedforward_torque {
        p.feedforward_torque = v;
    }
    if let Some(v) = args.kp_scale {
        p.kp_scale = v;
    }
    if let Some(v) = args.kd_scale {
        p.kd_scale = v;
    }
    if let Some(v) = args.maximum_torque {
        p.maximum_torque = v;
    }
    if let Some(v) = args.reset_torque {
        p.reset_torque = v;
    }
    if let Some(v) = args.termination_time {
        p.termination_time = v;
    }
    p
}

/// Execute one full maneuver per the config and CLI overrides.
pub fn run_maneuver(
    cfg: &Config,
    args: &RunArgs,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        let lock = args
            .rt_lock
            .unwrap_or_else(crate::cli::RtLock::os_default);
        #[cfg(target_os = "linux")]
        crate::rt::setup_rt_once(args.rt, args.rt_prio, lock, args.rt_cpu);
        #[cfg(target_os = "macos")]
        crate::rt::setup_rt_once(args.rt, lock);
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    if args.rt {
        tracing::warn!("--rt requested but unsupported on this OS; ignoring");
    }

    let phase_cfg = effective_phase_cfg(cfg, args);
    let mut timeouts = Timeouts::from(&cfg.timeouts);
    if let Some(ms) = args.timeout_ms {
        timeouts.command_ms = ms;
    }

    let _ = LAST_MANEUVER.set(CliManeuver {
        t_begin: phase_cfg.t_begin,
        t_reset: phase_cfg.t_reset,
        pd_begin: phase_cfg.pd_begin,
        pd_target: phase_cfg.pd_target,
        termination_time: phase_cfg.termination_time,
        command_ms: timeouts.command_ms,
    });

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.telemetry.out));

    let servo = SimulatedServo::from_env(sim_params(&cfg.sim));
    let mut sink = JsonFileSink::new(out.clone());
    let check: Box<dyn Fn() -> bool> = Box::new(move || shutdown.load(Ordering::Relaxed));

    let report = runner::run(servo, &mut sink, phase_cfg, timeouts, Some(check), None)?;

    if json_mode() {
        println!(
            "{}",
            serde_json::json!({
                "status": "complete",
                "iterations": report.iterations,
                "elapsed_s": report.elapsed_s,
                "final_position": report.final_position,
                "samples": report.samples_flushed,
                "telemetry": out.display().to_string(),
            })
        );
    } else {
        println!(
            "Maneuver complete: {} samples over {:.3} s, final position {:.3} rev",
            report.samples_flushed, report.elapsed_s, report.final_position
        );
        println!("Telemetry written to {}", out.display());
    }

    if args.stats {
        print_stats(&report);
    }
    Ok(())
}

/// Loop-rate statistics on stderr, so stdout stays parseable.
fn print_stats(report: &runner::RunReport) {
    let mean_hz = if report.elapsed_s > 0.0 {
        report.iterations as f64 / report.elapsed_s
    } else {
        0.0
    };
    eprintln!("--- Pounce Stats ---");
    eprintln!("Iterations:            {}", report.iterations);
    eprintln!("Elapsed (s):           {:.4}", report.elapsed_s);
    eprintln!("Mean rate (Hz):        {mean_hz:.1}");
    eprintln!(
        "Filtered period (us):  {:.0}",
        report.dt_filtered_s * 1_000_000.0
    );
}

/// One stop plus one queried hold command against the simulated servo.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut servo = SimulatedServo::from_env(sim_params(&cfg.sim));
    let timeout = Duration::from_millis(cfg.timeouts.command_ms);

    servo
        .stop()
        .map_err(|e| eyre::Report::new(map_servo_error(&*e)))
        .wrap_err("self-check: clearing servo state")?;

    let cmd = Command {
        position: Some(0.0),
        feedforward_torque: None,
        kp_scale: 1.0,
        kd_scale: 1.0,
        maximum_torque: 0.1,
        query: true,
    };
    let state = servo
        .send_command(&cmd, timeout)
        .map_err(|e| eyre::Report::new(map_servo_error(&*e)))
        .wrap_err("self-check: commanding servo")?
        .ok_or_else(|| eyre::eyre!("self-check: servo returned no state for a queried command"))?;

    if json_mode() {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "position": state.position })
        );
    } else {
        println!("self-check ok: simulated servo at {:.3} rev", state.position);
    }
    Ok(())
}
