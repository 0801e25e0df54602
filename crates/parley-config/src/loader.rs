//! Layered configuration loading.
//!
//! Implements the `load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file, if one is given and present
//! 3. Apply env var fallbacks for fields the file left unset
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration from defaults, an optional file, and the process
/// environment.
///
/// A `path` that does not exist is skipped, not an error.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable or malformed, an env
/// var has the wrong type, or the merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Same as [`load`] with an explicit environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;
    let mut sources = FieldSources::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut sources);

    if let Some(path) = path
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::File, &mut sources);
        info!(path = %path.display(), "loaded config file");
    }

    let applied = apply_env_fallbacks(&mut merged, &mut sources, env_vars)?;
    if applied > 0 {
        debug!(count = applied, "applied env var fallbacks");
    }

    finish(merged, "<merged config>")
}

impl Config {
    /// Load configuration. See [`load`].
    ///
    /// # Errors
    ///
    /// See [`load`].
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        load(path)
    }

    /// Parse configuration from a TOML string layered over the defaults.
    ///
    /// The environment is not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] for malformed TOML and
    /// [`ConfigError::ValidationError`] for out-of-range values.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;
        let overlay = parse(content, "<string>")?;
        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::File, &mut sources);
        finish(merged, "<string>")
    }
}

fn parse(content: &str, origin: &str) -> ConfigResult<toml::Value> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })
}

fn finish(merged: toml::Value, origin: &str) -> ConfigResult<Config> {
    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if u64::try_from(content.len()).unwrap_or(u64::MAX) > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    parse(&content, &path.display().to_string()).map(Some)
}
