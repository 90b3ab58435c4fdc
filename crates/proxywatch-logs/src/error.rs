use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the tailer, the buffer and the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The log file did not exist when monitoring was requested
    #[error("log file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The log file could not be read during a session
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A setter was given a value outside its domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl MonitorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
