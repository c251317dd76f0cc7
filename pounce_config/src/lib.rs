#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the maneuver rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated
//!   eagerly via [`Config::validate`]: an invariant violation is rejected at
//!   startup, never discovered mid-loop.
//! - Defaults for the optional maneuver fields match the reference rig
//!   (unity gain scales, 0.2 Nm reset torque, 1.0 s run).

use serde::Deserialize;

/// Timed phase-sequence parameters for one run.
///
/// Times are seconds from run start, positions are revolutions, torques are
/// newton-metres. The phase boundaries must satisfy
/// `0 <= t_begin <= t_reset <= termination_time`.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ManeuverCfg {
    /// Hold position 0.0 until this time; the push starts here.
    pub t_begin: f64,
    /// Settle phase ends and the gentle return to zero starts here.
    pub t_reset: f64,
    /// Position threshold (revolutions) at which the push hands over to
    /// position control.
    pub pd_begin: f64,
    /// Position target (revolutions) for the settle phase.
    pub pd_target: f64,
    /// Open-loop torque applied during the push.
    pub feedforward_torque: f64,
    /// Scale on the servo's configured kp during position phases.
    #[serde(default = "default_gain_scale")]
    pub kp_scale: f64,
    /// Scale on the servo's configured kd during position phases.
    #[serde(default = "default_gain_scale")]
    pub kd_scale: f64,
    /// Torque limit for every phase except the reset.
    #[serde(default = "default_maximum_torque")]
    pub maximum_torque: f64,
    /// Reduced torque limit for the return-to-zero phase.
    #[serde(default = "default_reset_torque")]
    pub reset_torque: f64,
    /// The loop finishes at the first sample past this time.
    #[serde(default = "default_termination_time")]
    pub termination_time: f64,
}

fn default_gain_scale() -> f64 {
    1.0
}

fn default_maximum_torque() -> f64 {
    1.0
}

fn default_reset_torque() -> f64 {
    0.2
}

fn default_termination_time() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Timeouts {
    /// Max wait per command/response exchange with the servo (ms).
    pub command_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { command_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Telemetry {
    /// Path the full sample sequence is written to at run end.
    pub out: String,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            out: "pounce_log.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters for the simulated servo used when no hardware is attached.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimCfg {
    /// Simulated command/response round trip in microseconds. The loop runs
    /// as fast as this allows; 2500 us reproduces the reference ~400 Hz.
    pub latency_us: u64,
    /// Revolutions per second of rotor speed per newton-metre of
    /// feedforward torque.
    pub torque_gain: f64,
    /// First-order time constant for position tracking (seconds).
    pub track_tau_s: f64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            latency_us: 2_500,
            torque_gain: 5.0,
            track_tau_s: 0.05,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub maneuver: ManeuverCfg,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub telemetry: Telemetry,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        let m = &self.maneuver;

        for (name, v) in [
            ("t_begin", m.t_begin),
            ("t_reset", m.t_reset),
            ("pd_begin", m.pd_begin),
            ("pd_target", m.pd_target),
            ("feedforward_torque", m.feedforward_torque),
            ("kp_scale", m.kp_scale),
            ("kd_scale", m.kd_scale),
            ("maximum_torque", m.maximum_torque),
            ("reset_torque", m.reset_torque),
            ("termination_time", m.termination_time),
        ] {
            if !v.is_finite() {
                eyre::bail!("maneuver.{name} must be finite");
            }
        }

        // Phase ordering: 0 <= t_begin <= t_reset <= termination_time
        if m.t_begin < 0.0 {
            eyre::bail!("maneuver.t_begin must be >= 0");
        }
        if m.t_reset < m.t_begin {
            eyre::bail!("maneuver.t_reset must be >= t_begin");
        }
        if m.termination_time < m.t_reset {
            eyre::bail!("maneuver.termination_time must be >= t_reset");
        }
        if m.termination_time <= 0.0 {
            eyre::bail!("maneuver.termination_time must be > 0");
        }

        if m.maximum_torque <= 0.0 {
            eyre::bail!("maneuver.maximum_torque must be > 0");
        }
        if m.reset_torque < 0.0 {
            eyre::bail!("maneuver.reset_torque must be >= 0");
        }
        if m.kp_scale < 0.0 {
            eyre::bail!("maneuver.kp_scale must be >= 0");
        }
        if m.kd_scale < 0.0 {
            eyre::bail!("maneuver.kd_scale must be >= 0");
        }

        // Timeouts
        if self.timeouts.command_ms == 0 {
            eyre::bail!("timeouts.command_ms must be >= 1");
        }

        // Telemetry
        if self.telemetry.out.trim().is_empty() {
            eyre::bail!("telemetry.out must not be empty");
        }

        // Sim plant
        if !self.sim.torque_gain.is_finite() || self.sim.torque_gain <= 0.0 {
            eyre::bail!("sim.torque_gain must be > 0");
        }
        if !self.sim.track_tau_s.is_finite() || self.sim.track_tau_s <= 0.0 {
            eyre::bail!("sim.track_tau_s must be > 0");
        }

        Ok(())
    }
}
