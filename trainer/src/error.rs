use std::{fmt, io};

use ftrl_core::CoreError;

/// The trainer's result type.
pub type Result<T> = std::result::Result<T, TrainError>;

/// All errors that can abort a training run.
#[derive(Debug)]
pub enum TrainError {
    /// Invalid configuration — caught before any state is written.
    InvalidConfig(String),
    /// Opening or scanning an input failed.
    Io(io::Error),
    /// Loading or saving a model artifact failed.
    Model(CoreError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CoreError> for TrainError {
    fn from(value: CoreError) -> Self {
        Self::Model(value)
    }
}
