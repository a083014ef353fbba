use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of an embedding or generation provider.
///
/// These never escape the answer cascade; they select the next state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// Fatal misconfiguration; never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::DimensionMismatch { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence(_) | Error::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
