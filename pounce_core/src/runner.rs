//! Run a maneuver to completion under the unconditional stop-and-flush
//! contract.

use pounce_traits::Servo;
use pounce_traits::clock::Clock;

use crate::builder::build_maneuver;
use crate::config::{PhaseCfg, Timeouts};
use crate::error::{ManeuverError, Report, Result as CoreResult};
use crate::status::ManeuverStatus;
use crate::telemetry::TelemetrySink;

/// Summary of one completed run.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    /// Loop iterations executed (= telemetry samples recorded).
    pub iterations: usize,
    /// Elapsed seconds at the final iteration.
    pub elapsed_s: f64,
    /// Last position reported by the servo (revolutions).
    pub final_position: f64,
    /// EWMA-filtered loop period at run end (seconds).
    pub dt_filtered_s: f64,
    /// Samples handed to the sink by the single flush.
    pub samples_flushed: usize,
}

/// Drive the servo through the full phase sequence.
///
/// Whatever the loop outcome, the servo is asked to stop and the telemetry
/// buffer is flushed to `sink` exactly once before this returns. Error
/// precedence is loop over stop over flush: when the loop itself failed,
/// stop/flush failures are logged and suppressed so the loop error reaches
/// the caller.
pub fn run<S, K>(
    servo: S,
    sink: &mut K,
    cfg: PhaseCfg,
    timeouts: Timeouts,
    shutdown_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> CoreResult<RunReport>
where
    S: Servo + 'static,
    K: TelemetrySink + ?Sized,
{
    // A build failure precedes any servo interaction; nothing to clean up.
    let mut maneuver = build_maneuver(servo, cfg, timeouts, shutdown_check, clock)?;

    tracing::info!(
        t_begin = cfg.t_begin,
        t_reset = cfg.t_reset,
        termination_time = cfg.termination_time,
        "maneuver start"
    );

    let mut outcome = maneuver.begin();
    if outcome.is_ok() {
        outcome = loop {
            match maneuver.step() {
                Ok(ManeuverStatus::Running) => {}
                Ok(ManeuverStatus::Complete) => break Ok(()),
                Ok(ManeuverStatus::Aborted(e)) => break Err(Report::new(e)),
                Err(e) => break Err(e),
            }
        };
    }

    // Mandatory cleanup on every path out of the loop: final stop first,
    // then the one and only flush.
    let stopped = maneuver.stop_servo();
    let samples_flushed = maneuver.samples().len();
    let flushed = sink
        .flush(maneuver.samples())
        .map_err(|e| Report::new(ManeuverError::Telemetry(e.to_string())));

    match outcome {
        Err(e) => {
            if let Err(stop_err) = stopped {
                tracing::warn!(error = %stop_err, "servo stop failed during cleanup");
            }
            if let Err(flush_err) = flushed {
                tracing::warn!(error = %flush_err, "telemetry flush failed during cleanup");
            }
            tracing::error!(error = %e, "maneuver aborted");
            Err(e)
        }
        Ok(()) => {
            if let Err(stop_err) = stopped {
                if let Err(flush_err) = flushed {
                    tracing::warn!(error = %flush_err, "telemetry flush failed during cleanup");
                }
                return Err(stop_err);
            }
            flushed?;

            let report = RunReport {
                iterations: samples_flushed,
                elapsed_s: maneuver.elapsed_s(),
                final_position: maneuver.last_position(),
                dt_filtered_s: maneuver.dt_filtered_s(),
                samples_flushed,
            };
            tracing::info!(
                iterations = report.iterations,
                elapsed_s = report.elapsed_s,
                final_position = report.final_position,
                dt_filtered_s = report.dt_filtered_s,
                "maneuver complete"
            );
            Ok(report)
        }
    }
}
