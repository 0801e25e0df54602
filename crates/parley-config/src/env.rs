//! Environment variable fallback.
//!
//! Env vars are a fallback, not an override: they only fill fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// How an env var value is coerced into TOML.
#[derive(Debug, Clone, Copy)]
enum Kind {
    String,
    Integer,
}

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: Kind,
}

/// All supported `PARLEY_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PARLEY_LOG_LEVEL",
        field_path: "logging.level",
        kind: Kind::String,
    },
    EnvMapping {
        var_name: "PARLEY_LOG_FORMAT",
        field_path: "logging.format",
        kind: Kind::String,
    },
    EnvMapping {
        var_name: "PARLEY_INTERACTIVITY_TIMEOUT_SECS",
        field_path: "interactivity.timeout_secs",
        kind: Kind::Integer,
    },
];

/// Apply environment variable fallbacks to fields that no config file set.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a variable cannot be coerced to the
/// type of its field.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults)
        {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );

        let toml_val = coerce(mapping, val)?;
        set_field(merged, mapping.field_path, toml_val);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, val: &str) -> ConfigResult<toml::Value> {
    match mapping.kind {
        Kind::String => Ok(toml::Value::String(val.to_owned())),
        Kind::Integer => val
            .trim()
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected an integer for {}: {e}", mapping.field_path),
            }),
    }
}

/// Set a dotted-path field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, val: toml::Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), val);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
