//! Telemetry errors.

use thiserror::Error;

/// Failure to install logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Unknown format, or a level or directive `EnvFilter` rejects.
    #[error("bad logging config: {0}")]
    ConfigError(String),

    /// A global subscriber is already installed.
    #[error("cannot install subscriber: {0}")]
    InitError(String),

    /// The log directory could not be created.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Shorthand for telemetry results.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
