//! Prelude module - commonly used types for convenient import.
//!
//! Use `use parley_telemetry::prelude::*;` to import all essential types.

pub use crate::{LogConfig, LogFormat, LogTarget, TelemetryError, TelemetryResult};
pub use crate::{setup_logging, setup_logging_from_section};
