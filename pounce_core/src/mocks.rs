//! Test and helper doubles for pounce_core.

use std::time::Duration;

use pounce_traits::{Command, Servo, ServoState};

use crate::telemetry::{TelemetrySample, TelemetrySink};

/// Servo that acknowledges every command and reports a fixed position.
pub struct StaticServo {
    pub position: f64,
}

impl Servo for StaticServo {
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn send_command(
        &mut self,
        cmd: &Command,
        _timeout: Duration,
    ) -> Result<Option<ServoState>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(cmd.query.then(|| ServoState {
            position: self.position,
            ..ServoState::default()
        }))
    }
}

/// Sink that stores every flush it is handed, for assertions.
#[derive(Default)]
pub struct MemorySink {
    pub flushes: Vec<Vec<TelemetrySample>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The samples of the single expected flush; `None` when the flush count
    /// is anything but one.
    pub fn only_flush(&self) -> Option<&[TelemetrySample]> {
        match self.flushes.as_slice() {
            [one] => Some(one.as_slice()),
            _ => None,
        }
    }
}

impl TelemetrySink for MemorySink {
    fn flush(
        &mut self,
        samples: &[TelemetrySample],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.flushes.push(samples.to_vec());
        Ok(())
    }
}
