//! Interactivity settings.

use std::time::Duration;

use parley_config::{Config, InteractivitySection};

/// Default wait and collect window.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the [`Interactivity`](crate::Interactivity) facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractivityConfig {
    /// Timeout used when a call passes `None`.
    pub timeout: Duration,
}

impl InteractivityConfig {
    /// Use `timeout` as the default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for InteractivityConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl From<&InteractivitySection> for InteractivityConfig {
    fn from(section: &InteractivitySection) -> Self {
        Self {
            timeout: section.timeout(),
        }
    }
}

impl From<&Config> for InteractivityConfig {
    fn from(config: &Config) -> Self {
        Self::from(&config.interactivity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sixty_seconds() {
        assert_eq!(InteractivityConfig::default().timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_config_section() {
        let config = Config::from_toml_str("[interactivity]\ntimeout_secs = 15").unwrap();
        let settings = InteractivityConfig::from(&config);
        assert_eq!(settings.timeout, Duration::from_secs(15));
    }
}
