use std::{fmt, io, path::PathBuf};

/// The core module's result type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failures while reading or writing model artifacts.
#[derive(Debug)]
pub enum CoreError {
    Io(io::Error),
    /// A model or state file deviated from its expected layout.
    Format { path: PathBuf, what: &'static str },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Io(e) => write!(f, "io error: {e}"),
            CoreError::Format { path, what } => {
                write!(f, "malformed model file {}: {what}", path.display())
            }
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CoreError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
