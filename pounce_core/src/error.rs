use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ManeuverError {
    #[error("servo error: {0}")]
    Servo(String),
    #[error("servo fault: {0}")]
    ServoFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for servo")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    #[error("telemetry error: {0}")]
    Telemetry(String),
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

/// Why a run was cut short without a servo or telemetry failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("interrupted")]
    Interrupted,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing servo")]
    MissingServo,
    #[error("missing phase configuration")]
    MissingPhaseCfg,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
