//! Interactivity error types.
//!
//! Only caller contract violations are errors. A wait that times out, is
//! cancelled, or loses its event source resolves to an empty result instead.

use std::time::Duration;

use parley_events::BusError;
use thiserror::Error;

/// Errors returned synchronously when a request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractivityError {
    /// The timeout is zero or too large to form a deadline.
    #[error("invalid timeout {timeout:?}: must be non-zero and representable as a deadline")]
    InvalidTimeout {
        /// The rejected timeout.
        timeout: Duration,
    },

    /// The component was disposed and accepts no new requests.
    #[error("{component} has been disposed")]
    Disposed {
        /// Which component was used after disposal.
        component: &'static str,
    },

    /// `dispose` was called a second time.
    #[error("{component} was already disposed")]
    AlreadyDisposed {
        /// Which component was disposed twice.
        component: &'static str,
    },

    /// Subscribing to the event source failed.
    #[error("event source subscription failed: {0}")]
    Bus(#[from] BusError),
}

/// Result type for interactivity operations.
pub type InteractivityResult<T> = Result<T, InteractivityError>;
