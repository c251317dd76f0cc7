//! `From` implementations bridging `pounce_config` types to `pounce_core` types.
//!
//! These keep the field-by-field mapping out of the CLI.

use crate::config::{PhaseCfg, Timeouts};

// ── PhaseCfg ─────────────────────────────────────────────────────────────────

impl From<&pounce_config::ManeuverCfg> for PhaseCfg {
    fn from(c: &pounce_config::ManeuverCfg) -> Self {
        Self {
            t_begin: c.t_begin,
            t_reset: c.t_reset,
            pd_begin: c.pd_begin,
            pd_target: c.pd_target,
            feedforward_torque: c.feedforward_torque,
            kp_scale: c.kp_scale,
            kd_scale: c.kd_scale,
            maximum_torque: c.maximum_torque,
            reset_torque: c.reset_torque,
            termination_time: c.termination_time,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&pounce_config::Timeouts> for Timeouts {
    fn from(c: &pounce_config::Timeouts) -> Self {
        Self {
            command_ms: c.command_ms,
        }
    }
}
