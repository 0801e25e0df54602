//! Errors raised while loading configuration.

use std::io;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read, or is too large.
    #[error("cannot read config {path}: {source}")]
    ReadError {
        /// Offending file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A layer is not valid TOML, or does not fit the config schema.
    #[error("malformed config {path}: {source}")]
    ParseError {
        /// File, or a `<...>` label for in-memory layers.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid value for {field}: {message}")]
    ValidationError {
        /// Dotted key, e.g. `interactivity.timeout_secs`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A `PARLEY_*` variable could not be converted to its field's type.
    #[error("invalid ${var_name}: {message}")]
    EnvError {
        /// Variable name.
        var_name: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Shorthand for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
