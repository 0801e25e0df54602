//! Event bus error types.

use thiserror::Error;

/// Errors returned by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The bus has been shut down and accepts no new subscriptions.
    #[error("event bus is shut down")]
    Closed,
}

/// Result type for event bus operations.
pub type BusResult<T> = Result<T, BusError>;
