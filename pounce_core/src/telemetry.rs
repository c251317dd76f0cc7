//! Ordered telemetry buffer vocabulary and the sink it is flushed to.

use pounce_traits::ServoState;

/// One recorded loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// Seconds since run start at the moment the command was issued.
    pub elapsed_s: f64,
    /// State reported by the servo for this iteration's query.
    pub state: ServoState,
}

/// Destination for the full sample sequence of one run.
///
/// `flush` is called exactly once per run, after the final stop, with every
/// sample in issue order. Implementations must not assume a successful run:
/// a flush after an abort carries the samples recorded up to the failure.
pub trait TelemetrySink {
    fn flush(
        &mut self,
        samples: &[TelemetrySample],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Sink that discards all samples, for runs without persistence.
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn flush(
        &mut self,
        _samples: &[TelemetrySample],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
