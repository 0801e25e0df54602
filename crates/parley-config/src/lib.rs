#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Parley chat SDK.
//!
//! # Usage
//!
//! ```rust,no_run
//! use parley_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("parley.toml"))).unwrap();
//! println!("Default wait timeout: {:?}", config.interactivity.timeout());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** passed to [`load`]
//! 2. **Environment variables** (`PARLEY_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other internal parley crates.
//! Conversion to runtime types happens in the consuming crates.

pub mod prelude;

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Layered configuration merging with precedence.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Post-merge validation.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_with_env};
pub use merge::ConfigLayer;
pub use types::{Config, InteractivitySection, LoggingSection};
