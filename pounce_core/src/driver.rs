//! The polling control loop around one servo (`ManeuverCore`).
//!
//! Each iteration samples the clock, selects the phase command, exchanges it
//! with the servo, and records the reported state. There is no sleep in the
//! loop: the iteration rate is bounded only by the servo round trip.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use pounce_traits::clock::Clock;
use pounce_traits::{Phase, Servo};

use crate::config::{PhaseCfg, Timeouts};
use crate::error::{AbortReason, ManeuverError, Result};
use crate::sequencer::PhaseSequencer;
use crate::servo_error::map_servo_error;
use crate::status::ManeuverStatus;
use crate::telemetry::TelemetrySample;
use crate::timing::LoopTiming;

/// Unified core for both dynamic (boxed) and generic (static dispatch)
/// variants.
pub struct ManeuverCore<S: Servo> {
    pub(crate) servo: S,
    pub(crate) cfg: PhaseCfg,
    pub(crate) timeouts: Timeouts,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) sequencer: PhaseSequencer,
    pub(crate) timing: LoopTiming,

    pub(crate) last_position: f64,
    pub(crate) last_phase: Option<Phase>,
    pub(crate) samples: Vec<TelemetrySample>,
    pub(crate) shutdown_check: Option<Box<dyn Fn() -> bool>>,
    pub(crate) shutdown_latched: bool,
}

impl<S: Servo> core::fmt::Debug for ManeuverCore<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManeuverCore")
            .field("last_position", &self.last_position)
            .field("last_phase", &self.last_phase)
            .field("samples", &self.samples.len())
            .finish()
    }
}

impl<S: Servo> ManeuverCore<S> {
    /// Last position reported by the servo (revolutions).
    pub fn last_position(&self) -> f64 {
        self.last_position
    }

    /// Phase commanded by the most recent step, if any.
    pub fn phase(&self) -> Option<Phase> {
        self.last_phase
    }

    /// EWMA-filtered loop period in seconds.
    pub fn dt_filtered_s(&self) -> f64 {
        self.timing.dt_filtered_s()
    }

    /// Elapsed seconds at the most recent recorded iteration.
    pub fn elapsed_s(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.elapsed_s)
    }

    /// Samples recorded so far, in issue order.
    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// Reset per-run state and clear any latched servo fault. Call before
    /// stepping a new run.
    pub fn begin(&mut self) -> Result<()> {
        // A prior run may have left the controller in a latched fault state
        // that rejects motion commands; stop doubles as the fault clear.
        self.servo
            .stop()
            .map_err(|e| eyre::Report::new(map_servo_error(&*e)))
            .wrap_err("clearing servo state")?;

        self.timing = LoopTiming::start(self.clock.now());
        self.sequencer.rearm();
        self.samples.clear();
        self.last_position = 0.0;
        self.last_phase = None;
        self.shutdown_latched = false;
        Ok(())
    }

    /// One iteration of the polling loop.
    pub fn step(&mut self) -> Result<ManeuverStatus> {
        if self.shutdown_latched || self.poll_shutdown() {
            if let Err(e) = self.stop_servo() {
                tracing::warn!(error = %e, "servo stop failed on interrupt");
            }
            return Ok(ManeuverStatus::Aborted(ManeuverError::Abort(
                AbortReason::Interrupted,
            )));
        }

        let tick = self.timing.tick(self.clock.now());
        let (phase, cmd) = self.sequencer.next_command(tick.elapsed_s, self.last_position);

        let timeout = Duration::from_millis(self.timeouts.command_ms);
        let state = self
            .servo
            .send_command(&cmd, timeout)
            .map_err(|e| eyre::Report::new(map_servo_error(&*e)))
            .wrap_err("commanding servo")?;
        let state = state.ok_or_else(|| {
            eyre::Report::new(ManeuverError::State(
                "servo acknowledged a queried command without state".into(),
            ))
        })?;

        self.last_position = state.position;
        self.samples.push(TelemetrySample {
            elapsed_s: tick.elapsed_s,
            state,
        });

        if self.last_phase != Some(phase) {
            tracing::debug!(
                phase = phase.name(),
                elapsed_s = tick.elapsed_s,
                position = state.position,
                "phase entered"
            );
            self.last_phase = Some(phase);
        }
        tracing::trace!(
            position = state.position,
            dt_s = tick.dt_s,
            dt_filtered_s = tick.dt_filtered_s,
            phase = phase.name(),
            "loop sample"
        );

        // Strictly greater: the iteration that crosses the deadline has
        // already commanded and recorded.
        if tick.elapsed_s > self.cfg.termination_time {
            return Ok(ManeuverStatus::Complete);
        }
        Ok(ManeuverStatus::Running)
    }

    /// Stop the servo (best-effort).
    pub fn stop_servo(&mut self) -> Result<()> {
        self.servo
            .stop()
            .map_err(|e| eyre::Report::new(map_servo_error(&*e)))
            .wrap_err("servo stop")
    }

    /// Run the external shutdown check and latch a positive answer.
    fn poll_shutdown(&mut self) -> bool {
        if let Some(check) = &self.shutdown_check
            && check()
        {
            self.shutdown_latched = true;
        }
        self.shutdown_latched
    }

    /// The run epoch, for callers correlating samples with wall time.
    pub fn epoch(&self) -> Instant {
        self.timing.epoch()
    }
}
