//! Type-state builder for `Maneuver` and the generic `build_maneuver`
//! constructor.
//!
//! The builder enforces at compile time that a servo and a phase config are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use pounce_traits::clock::{Clock, MonotonicClock};
use pounce_traits::{Phase, Servo};

use crate::config::{PhaseCfg, Timeouts};
use crate::driver::ManeuverCore;
use crate::error::{BuildError, Result};
use crate::sequencer::PhaseSequencer;
use crate::status::ManeuverStatus;
use crate::telemetry::TelemetrySample;
use crate::timing::LoopTiming;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Public dynamic (boxed) maneuver that hides the servo type via composition.
pub struct Maneuver {
    pub(crate) inner: ManeuverCore<Box<dyn Servo>>,
}

impl core::fmt::Debug for Maneuver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Maneuver")
            .field("last_position", &self.inner.last_position)
            .field("last_phase", &self.inner.last_phase)
            .field("samples", &self.inner.samples.len())
            .finish()
    }
}

impl Maneuver {
    /// Start building a Maneuver.
    pub fn builder() -> ManeuverBuilder<Missing, Missing> {
        ManeuverBuilder::default()
    }

    /// Reset per-run state and clear any latched servo fault.
    pub fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    /// One iteration of the polling loop.
    pub fn step(&mut self) -> Result<ManeuverStatus> {
        self.inner.step()
    }

    /// Stop the servo (best-effort).
    pub fn stop_servo(&mut self) -> Result<()> {
        self.inner.stop_servo()
    }

    /// Last position reported by the servo (revolutions).
    pub fn last_position(&self) -> f64 {
        self.inner.last_position()
    }

    /// Phase commanded by the most recent step, if any.
    pub fn phase(&self) -> Option<Phase> {
        self.inner.phase()
    }

    /// EWMA-filtered loop period in seconds.
    pub fn dt_filtered_s(&self) -> f64 {
        self.inner.dt_filtered_s()
    }

    /// Elapsed seconds at the most recent recorded iteration.
    pub fn elapsed_s(&self) -> f64 {
        self.inner.elapsed_s()
    }

    /// Samples recorded so far, in issue order.
    pub fn samples(&self) -> &[TelemetrySample] {
        self.inner.samples()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Maneuver`. All numeric validation happens on `build()`.
pub struct ManeuverBuilder<S, C> {
    servo: Option<Box<dyn Servo>>,
    cfg: Option<PhaseCfg>,
    timeouts: Option<Timeouts>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    shutdown_check: Option<Box<dyn Fn() -> bool>>,
    _s: PhantomData<S>,
    _c: PhantomData<C>,
}

impl Default for ManeuverBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            servo: None,
            cfg: None,
            timeouts: None,
            clock: None,
            shutdown_check: None,
            _s: PhantomData,
            _c: PhantomData,
        }
    }
}

/// Validate the phase configuration and construct a `ManeuverCore`.
///
/// This is the single source of truth for validation and construction,
/// used by both `ManeuverBuilder::try_build()` and `build_maneuver()`.
fn validate_and_build<S: Servo>(
    servo: S,
    cfg: PhaseCfg,
    timeouts: Timeouts,
    shutdown_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ManeuverCore<S>> {
    // ── Validation ───────────────────────────────────────────────────────────
    let fields = [
        cfg.t_begin,
        cfg.t_reset,
        cfg.pd_begin,
        cfg.pd_target,
        cfg.feedforward_torque,
        cfg.kp_scale,
        cfg.kd_scale,
        cfg.maximum_torque,
        cfg.reset_torque,
        cfg.termination_time,
    ];
    if !fields.iter().all(|v| v.is_finite()) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "phase parameters must be finite",
        )));
    }
    if cfg.t_begin < 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "t_begin must be >= 0",
        )));
    }
    if cfg.t_reset < cfg.t_begin {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "t_reset must be >= t_begin",
        )));
    }
    if cfg.termination_time < cfg.t_reset {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "termination_time must be >= t_reset",
        )));
    }
    if cfg.termination_time <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "termination_time must be > 0",
        )));
    }
    if cfg.maximum_torque <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "maximum_torque must be > 0",
        )));
    }
    if cfg.reset_torque < 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "reset_torque must be >= 0",
        )));
    }
    if cfg.kp_scale < 0.0 || cfg.kd_scale < 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "gain scales must be >= 0",
        )));
    }
    if timeouts.command_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "command_ms must be >= 1",
        )));
    }

    // ── Construct ────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let timing = LoopTiming::start(clock.now());

    Ok(ManeuverCore {
        servo,
        cfg,
        timeouts,
        clock,
        sequencer: PhaseSequencer::new(cfg),
        timing,
        last_position: 0.0,
        last_phase: None,
        samples: Vec::with_capacity(1024),
        shutdown_check,
        shutdown_latched: false,
    })
}

impl<S, C> ManeuverBuilder<S, C> {
    /// Fallible build available in any type-state; returns a typed error for
    /// missing pieces.
    pub fn try_build(self) -> Result<Maneuver> {
        let servo = self
            .servo
            .ok_or_else(|| eyre::Report::new(BuildError::MissingServo))?;
        let cfg = self
            .cfg
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPhaseCfg))?;

        let inner = validate_and_build(
            servo,
            cfg,
            self.timeouts.unwrap_or_default(),
            self.shutdown_check,
            self.clock,
        )?;

        Ok(Maneuver { inner })
    }
}

/// Chainable setters that do not affect type-state.
impl<S, C> ManeuverBuilder<S, C> {
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// External cancellation hook, polled once per iteration. A `true`
    /// answer latches; the run aborts with `Interrupted`.
    pub fn with_shutdown_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.shutdown_check = Some(Box::new(f));
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock`
    /// when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<C> ManeuverBuilder<Missing, C> {
    pub fn with_servo(self, servo: impl Servo + 'static) -> ManeuverBuilder<Set, C> {
        ManeuverBuilder {
            servo: Some(Box::new(servo)),
            cfg: self.cfg,
            timeouts: self.timeouts,
            clock: self.clock,
            shutdown_check: self.shutdown_check,
            _s: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<S> ManeuverBuilder<S, Missing> {
    pub fn with_phase_cfg(self, cfg: PhaseCfg) -> ManeuverBuilder<S, Set> {
        ManeuverBuilder {
            servo: self.servo,
            cfg: Some(cfg),
            timeouts: self.timeouts,
            clock: self.clock,
            shutdown_check: self.shutdown_check,
            _s: PhantomData,
            _c: PhantomData,
        }
    }
}

impl ManeuverBuilder<Set, Set> {
    /// Validate and build the Maneuver. Only available when the servo and
    /// the phase config are set.
    pub fn build(self) -> Result<Maneuver> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the unified core.
pub type ManeuverG<S> = ManeuverCore<S>;

/// Build a generic, statically-dispatched `ManeuverG` from a concrete servo.
///
/// Delegates to the shared `validate_and_build`; no duplicated validation
/// logic.
pub fn build_maneuver<S>(
    servo: S,
    cfg: PhaseCfg,
    timeouts: Timeouts,
    shutdown_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ManeuverG<S>>
where
    S: Servo + 'static,
{
    validate_and_build(servo, cfg, timeouts, shutdown_check, clock)
}
