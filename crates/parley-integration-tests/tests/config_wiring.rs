//! Integration tests wiring configuration into logging and interactivity.

#![allow(clippy::arithmetic_side_effects)]

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parley_config::{Config, ConfigError, load_with_env};
use parley_core::MessageCreated;
use parley_interactivity::{Interactivity, InteractivityConfig, InteractivityError};
use parley_telemetry::{LogConfig, LogFormat};
use parley_test::test_config_file;
use tokio::time::Instant;

use common::bus;

#[tokio::test(start_paused = true)]
async fn test_configured_timeout_applies_to_unspecified_waits() {
    let config = Config::from_toml_str("[interactivity]\ntimeout_secs = 2\n").unwrap();
    let interactivity =
        Interactivity::with_config(bus(), InteractivityConfig::from(&config));
    assert_eq!(interactivity.config().timeout, Duration::from_secs(2));

    let start = Instant::now();
    let outcome = interactivity
        .wait_for(|_: &MessageCreated| true, None)
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_explicit_timeout_overrides_configured_default() {
    let config = Config::from_toml_str("[interactivity]\ntimeout_secs = 30\n").unwrap();
    let interactivity =
        Interactivity::with_config(bus(), InteractivityConfig::from(&config));

    let start = Instant::now();
    let collected = interactivity
        .collect(|_: &MessageCreated| true, Some(Duration::from_millis(250)))
        .await
        .unwrap();

    assert!(collected.is_empty());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_zero_timeout_is_rejected_by_validation() {
    let err = Config::from_toml_str("[interactivity]\ntimeout_secs = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
}

#[test]
fn test_file_wins_over_env_fallback() {
    let file = test_config_file("[interactivity]\ntimeout_secs = 5\n");
    let env = HashMap::from([(
        "PARLEY_INTERACTIVITY_TIMEOUT_SECS".to_owned(),
        "9".to_owned(),
    )]);

    let config = load_with_env(Some(file.path()), &env).unwrap();
    assert_eq!(config.interactivity.timeout_secs, 5);
}

#[test]
fn test_env_fills_fields_the_file_leaves_unset() {
    let file = test_config_file("[logging]\nformat = \"json\"\n");
    let env = HashMap::from([
        (
            "PARLEY_INTERACTIVITY_TIMEOUT_SECS".to_owned(),
            "9".to_owned(),
        ),
        ("PARLEY_LOG_LEVEL".to_owned(), "debug".to_owned()),
    ]);

    let config = load_with_env(Some(file.path()), &env).unwrap();
    assert_eq!(
        InteractivityConfig::from(&config).timeout,
        Duration::from_secs(9)
    );

    let log = LogConfig::from_section(&config.logging).unwrap();
    assert_eq!(log.level, "debug");
    assert_eq!(log.format, LogFormat::Json);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_rejects_new_waits() {
    let bus = bus();
    let interactivity = Interactivity::new(Arc::clone(&bus));

    let pending = interactivity
        .register_match(|_: &MessageCreated| true, None)
        .unwrap();
    interactivity.shutdown().unwrap();

    assert!(pending.wait().await.is_none());
    assert!(matches!(
        interactivity.register_match(|_: &MessageCreated| true, None),
        Err(InteractivityError::Disposed { .. })
    ));
    assert_eq!(bus.subscriber_count(), 0);
}
