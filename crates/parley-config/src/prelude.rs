//! Prelude module - commonly used types for convenient import.
//!
//! Use `use parley_config::prelude::*;` to import all essential types.

pub use crate::{Config, ConfigError, ConfigResult, InteractivitySection, LoggingSection};
