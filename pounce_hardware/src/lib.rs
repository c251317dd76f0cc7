pub mod error;

use std::time::{Duration, Instant};

use pounce_traits::{Command, Servo, ServoState};

use crate::error::HwError;

/// Tuning for the simulated plant.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Command/response round trip. The polling loop has no sleep of its
    /// own, so this bounds the loop rate; 2500 us gives roughly 400 Hz.
    pub latency: Duration,
    /// Rotor speed per newton-metre of applied torque (rev/s per Nm).
    pub torque_gain: f64,
    /// First-order time constant for position tracking (seconds).
    pub track_tau_s: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            latency: Duration::from_micros(2_500),
            torque_gain: 5.0,
            track_tau_s: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Forced {
    Timeout,
    Fault(i64),
}

/// Simulated servo: a velocity-source rotor whose speed is proportional to
/// applied torque. Position commands approach their target with a
/// first-order lag, never faster than the torque cap allows; feedforward
/// commands spin the rotor open-loop. Gain scales are opaque controller
/// parameters and do not enter the plant model.
pub struct SimulatedServo {
    params: SimParams,
    position: f64,
    velocity: f64,
    last_update: Instant,
    forced: Option<Forced>,
}

impl SimulatedServo {
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            position: 0.0,
            velocity: 0.0,
            last_update: Instant::now(),
            forced: None,
        }
    }

    /// Like [`new`](Self::new), but honors the test-harness overrides
    /// `POUNCE_SIM_FORCE_TIMEOUT=1` and `POUNCE_SIM_FORCE_FAULT=<code>`.
    pub fn from_env(params: SimParams) -> Self {
        let mut servo = Self::new(params);
        if std::env::var("POUNCE_SIM_FORCE_TIMEOUT").is_ok_and(|v| v == "1") {
            servo.forced = Some(Forced::Timeout);
        } else if let Ok(v) = std::env::var("POUNCE_SIM_FORCE_FAULT")
            && let Ok(code) = v.parse::<i64>()
        {
            servo.forced = Some(Forced::Fault(code));
        }
        if let Some(forced) = servo.forced {
            tracing::debug!(?forced, "simulated servo failure injection armed");
        }
        servo
    }

    /// Every subsequent exchange fails with [`HwError::Timeout`].
    pub fn force_timeout(&mut self) {
        self.forced = Some(Forced::Timeout);
    }

    /// Every subsequent exchange fails with [`HwError::Fault`].
    pub fn force_fault(&mut self, code: i64) {
        self.forced = Some(Forced::Fault(code));
    }

    fn integrate(&mut self, cmd: &Command, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        match cmd.position {
            None => {
                let torque = cmd
                    .feedforward_torque
                    .unwrap_or(0.0)
                    .clamp(-cmd.maximum_torque, cmd.maximum_torque);
                self.velocity = self.params.torque_gain * torque;
                self.position += self.velocity * dt;
            }
            Some(target) => {
                // First-order approach, rate-limited to the speed the torque
                // cap can produce. Never overshoots.
                let alpha = 1.0 - (-dt / self.params.track_tau_s).exp();
                let desired = (target - self.position) * alpha;
                let max_step = self.params.torque_gain * cmd.maximum_torque * dt;
                let step = desired.clamp(-max_step, max_step);
                self.position += step;
                self.velocity = step / dt;
            }
        }
    }

    fn observed(&self) -> ServoState {
        ServoState {
            position: self.position,
            velocity: Some(self.velocity),
            torque: Some(self.velocity / self.params.torque_gain),
        }
    }
}

impl Servo for SimulatedServo {
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.velocity = 0.0;
        self.last_update = Instant::now();
        tracing::debug!(position = self.position, "simulated servo stopped");
        Ok(())
    }

    fn send_command(
        &mut self,
        cmd: &Command,
        timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn std::error::Error + Send + Sync>> {
        match self.forced {
            Some(Forced::Timeout) => {
                std::thread::sleep(timeout);
                return Err(Box::new(HwError::Timeout));
            }
            Some(Forced::Fault(code)) => return Err(Box::new(HwError::Fault { code })),
            None => {}
        }

        // A round trip slower than the caller's deadline is a timeout too.
        if self.params.latency > timeout {
            std::thread::sleep(timeout);
            return Err(Box::new(HwError::Timeout));
        }
        std::thread::sleep(self.params.latency);

        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.integrate(cmd, dt);

        tracing::trace!(
            position = self.position,
            velocity = self.velocity,
            "simulated exchange"
        );
        Ok(cmd.query.then(|| self.observed()))
    }
}
