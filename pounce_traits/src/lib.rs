pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Control regime a single command belongs to.
///
/// The maneuver walks these in order; `Push` may be skipped entirely when the
/// position threshold is already behind the rotor at `t_begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Hold position 0.0 with configured gains (pre-push settling).
    HoldZero,
    /// Open-loop feedforward torque, position gains zeroed.
    Push,
    /// Position-target settle at `pd_target` with configured gains.
    Settle,
    /// Return to 0.0 under the reduced reset torque limit.
    Reset,
}

impl Phase {
    /// Short lowercase name, stable for logs and telemetry.
    pub fn name(self) -> &'static str {
        match self {
            Phase::HoldZero => "hold-zero",
            Phase::Push => "push",
            Phase::Settle => "settle",
            Phase::Reset => "reset",
        }
    }
}

/// One position-mode command for the servo.
///
/// `position == None` means the command carries no position term at all: the
/// servo is driven by `feedforward_torque` alone (gains are zeroed by the
/// caller in that case). `query` asks the servo to report its observed state
/// in the same exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub position: Option<f64>,
    pub feedforward_torque: Option<f64>,
    pub kp_scale: f64,
    pub kd_scale: f64,
    pub maximum_torque: f64,
    pub query: bool,
}

/// Observed servo state returned for a queried command.
///
/// `position` is in revolutions. Velocity and torque are pass-through
/// telemetry; controllers that do not report them leave them `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServoState {
    pub position: f64,
    pub velocity: Option<f64>,
    pub torque: Option<f64>,
}

/// A single position/torque-controlled servo reachable over some
/// request/response transport.
///
/// Implementations must tolerate `stop()` being called at any point,
/// including twice in a row and before any motion command: it doubles as the
/// fault-clear operation on controllers that latch faults.
pub trait Servo {
    /// Stop motion and clear a latched fault, if any.
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Issue one command and wait for the exchange to complete.
    ///
    /// Returns the observed state when `cmd.query` was honored, `None` when
    /// the command carried no query. Implementations should give up after
    /// `timeout` rather than wait on an unresponsive controller.
    fn send_command(
        &mut self,
        cmd: &Command,
        timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<S: Servo + ?Sized> Servo for Box<S> {
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).stop()
    }

    fn send_command(
        &mut self,
        cmd: &Command,
        timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).send_command(cmd, timeout)
    }
}

impl<S: Servo + ?Sized> Servo for &mut S {
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).stop()
    }

    fn send_command(
        &mut self,
        cmd: &Command,
        timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).send_command(cmd, timeout)
    }
}
