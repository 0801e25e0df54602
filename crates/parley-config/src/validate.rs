//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Longest accepted default timeout (one day).
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_interactivity(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_interactivity(config: &Config) -> ConfigResult<()> {
    let secs = config.interactivity.timeout_secs;
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::ValidationError {
            field: "interactivity.timeout_secs".to_owned(),
            message: format!(
                "timeout {secs}s is out of range; must be between 1 and {MAX_TIMEOUT_SECS}"
            ),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if l.level.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: "log level must not be empty".to_owned(),
        });
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json") {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.interactivity.timeout_secs = 0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "interactivity.timeout_secs"
        ));
    }

    #[test]
    fn test_timeout_over_a_day_rejected() {
        let mut config = Config::default();
        config.interactivity.timeout_secs = MAX_TIMEOUT_SECS.saturating_add(1);
        assert!(validate(&config).is_err());

        config.interactivity.timeout_secs = MAX_TIMEOUT_SECS;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "full".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "  ".to_owned();
        assert!(validate(&config).is_err());
    }
}
