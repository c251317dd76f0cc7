//! Phase selection: elapsed time plus last observed position pick the next
//! control command.
//!
//! Pure decision logic: no I/O, no failure modes. The only cross-call state
//! is the one-way `past_push_threshold` latch, set on first entry into the
//! settle phase and cleared only by `rearm()` for a new run.

use pounce_traits::{Command, Phase};

use crate::config::PhaseCfg;

/// The four-phase decision chain with its hysteresis latch.
#[derive(Debug, Clone)]
pub struct PhaseSequencer {
    cfg: PhaseCfg,
    past_push_threshold: bool,
}

impl PhaseSequencer {
    pub fn new(cfg: PhaseCfg) -> Self {
        Self {
            cfg,
            past_push_threshold: false,
        }
    }

    /// Clear the latch for a fresh run.
    pub fn rearm(&mut self) {
        self.past_push_threshold = false;
    }

    /// True once the settle phase has been entered this run.
    pub fn past_push_threshold(&self) -> bool {
        self.past_push_threshold
    }

    /// Select the phase and command for one iteration.
    ///
    /// The predicates are evaluated in order and the first match wins: the
    /// time gate dominates position before `t_begin`, and the latch keeps
    /// the push from re-arming once the settle phase has run. A rotor that
    /// never reaches `pd_begin` keeps pushing for the remainder of the run;
    /// the run still ends at the termination time.
    pub fn next_command(&mut self, elapsed_s: f64, position: f64) -> (Phase, Command) {
        let cfg = &self.cfg;
        if elapsed_s < cfg.t_begin {
            (
                Phase::HoldZero,
                Command {
                    position: Some(0.0),
                    feedforward_torque: None,
                    kp_scale: cfg.kp_scale,
                    kd_scale: cfg.kd_scale,
                    maximum_torque: cfg.maximum_torque,
                    query: true,
                },
            )
        } else if position < cfg.pd_begin && !self.past_push_threshold {
            // Open-loop: gains zeroed, torque alone drives toward the
            // threshold.
            (
                Phase::Push,
                Command {
                    position: None,
                    feedforward_torque: Some(cfg.feedforward_torque),
                    kp_scale: 0.0,
                    kd_scale: 0.0,
                    maximum_torque: cfg.maximum_torque,
                    query: true,
                },
            )
        } else if elapsed_s < cfg.t_reset {
            self.past_push_threshold = true;
            (
                Phase::Settle,
                Command {
                    position: Some(cfg.pd_target),
                    feedforward_torque: None,
                    kp_scale: cfg.kp_scale,
                    kd_scale: cfg.kd_scale,
                    maximum_torque: cfg.maximum_torque,
                    query: true,
                },
            )
        } else {
            (
                Phase::Reset,
                Command {
                    position: Some(0.0),
                    feedforward_torque: None,
                    kp_scale: cfg.kp_scale,
                    kd_scale: cfg.kd_scale,
                    maximum_torque: cfg.reset_torque,
                    query: true,
                },
            )
        }
    }
}
