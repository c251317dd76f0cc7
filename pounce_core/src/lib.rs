#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core maneuver logic (hardware-agnostic).
//!
//! This crate provides the hardware-independent phase-sequence engine. All
//! actuator interactions go through the `pounce_traits::Servo` trait.
//!
//! ## Architecture
//!
//! - **Sequencing**: elapsed time plus last observed position select the next
//!   control command (`sequencer` module)
//! - **Timing**: per-iteration period measurement with EWMA smoothing
//!   (`timing` module)
//! - **Driving**: the polling control loop around one servo (`ManeuverCore`)
//! - **Telemetry**: ordered sample buffer, flushed once per run (`telemetry`)
//! - **Status**: per-step outcome (`status` module)
//!
//! The loop deliberately contains no sleep: its rate is bounded only by the
//! servo's command/response round trip.

pub mod builder;
pub mod config;
mod conversions;
pub mod driver;
pub mod error;
pub mod mocks;
pub mod runner;
pub mod sequencer;
pub mod servo_error;
pub mod status;
pub mod telemetry;
pub mod timing;

pub use builder::{Maneuver, ManeuverBuilder, ManeuverG, Missing, Set, build_maneuver};
pub use config::{PhaseCfg, Timeouts};
pub use driver::ManeuverCore;
pub use error::{AbortReason, BuildError, ManeuverError};
pub use sequencer::PhaseSequencer;
pub use status::ManeuverStatus;
pub use telemetry::{NullSink, TelemetrySample, TelemetrySink};
pub use timing::{LoopTick, LoopTiming};
