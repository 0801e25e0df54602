//! Parley Telemetry - Logging setup for the Parley chat SDK.
//!
//! Every parley crate logs through `tracing`. This crate installs the global
//! subscriber: an `EnvFilter` built from the configured level and directives,
//! and a fmt layer writing pretty, compact or JSON output.
//!
//! # Example
//!
//! ```rust,no_run
//! use parley_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), parley_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("parley_interactivity=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
    setup_logging_from_section,
};
