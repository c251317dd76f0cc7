//! Configuration types for the maneuver engine.
//!
//! These are the runtime configuration structs used by `ManeuverCore`.
//! They are separate from the TOML-deserialized config in `pounce_config`.

/// Immutable phase-sequence parameters for one run.
///
/// Times are seconds from run start, positions revolutions, torques
/// newton-metres. Validated once at build time (`0 <= t_begin <= t_reset <=
/// termination_time`, `maximum_torque > 0`, everything finite); the loop
/// itself never re-checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseCfg {
    /// Hold position 0.0 until this time; the push starts here.
    pub t_begin: f64,
    /// Settle ends and the gentle return to zero starts here.
    pub t_reset: f64,
    /// Position threshold at which the push hands over to position control.
    pub pd_begin: f64,
    /// Position target for the settle phase.
    pub pd_target: f64,
    /// Open-loop torque applied during the push.
    pub feedforward_torque: f64,
    /// Scale on the servo's configured kp during position phases.
    pub kp_scale: f64,
    /// Scale on the servo's configured kd during position phases.
    pub kd_scale: f64,
    /// Torque limit for every phase except the reset.
    pub maximum_torque: f64,
    /// Reduced torque limit for the return-to-zero phase.
    pub reset_torque: f64,
    /// The run finishes at the first iteration past this time.
    pub termination_time: f64,
}

/// Timeouts for the servo exchange.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Max wait per command/response exchange (ms).
    pub command_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { command_ms: 100 }
    }
}
