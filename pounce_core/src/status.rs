//! Maneuver status returned from each control loop iteration.

use crate::error::ManeuverError;

/// Public status of a single step of the polling loop.
#[derive(Debug)]
pub enum ManeuverStatus {
    /// Keep going; termination time not reached.
    Running,
    /// Past termination time. The terminating iteration still commanded the
    /// servo and recorded its sample.
    Complete,
    /// Aborted with a typed error; the servo has been asked to stop.
    Aborted(ManeuverError),
}
