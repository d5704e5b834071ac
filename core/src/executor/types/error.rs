use thiserror::Error;

/// Shared executor error type.
pub type ExecutorError = crate::error::ExecutorError;

/// Errors reported by capabilities.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("{0}")]
    Failed(String),
}

impl From<std::io::Error> for CapabilityError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CapabilityError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArgs(err.to_string())
    }
}
