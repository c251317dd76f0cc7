use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("servo timeout")]
    Timeout,
    #[error("servo fault {code}")]
    Fault { code: i64 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
