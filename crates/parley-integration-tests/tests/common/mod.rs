//! Shared helpers for integration tests.

#![allow(dead_code, clippy::arithmetic_side_effects)]

use std::sync::Arc;
use std::time::Duration;

use parley_core::MessageCreated;
use parley_events::EventBus;
use parley_test::{TEST_CHANNEL, message_created};

/// A fresh bus.
pub fn bus() -> Arc<EventBus> {
    parley_test::setup_test_logging_default();
    Arc::new(EventBus::new())
}

/// A message in the test channel from user 1.
pub fn message(id: u64) -> MessageCreated {
    message_created(id, TEST_CHANNEL, 1, "hello")
}

/// Publish each `(delay, event)` pair from a background task, delays
/// measured from the moment this is called.
pub fn publish_later<E>(bus: &Arc<EventBus>, schedule: Vec<(Duration, E)>)
where
    E: Send + Sync + 'static,
{
    let bus = Arc::clone(bus);
    tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        for (at, event) in schedule {
            tokio::time::sleep_until(start + at).await;
            bus.publish(event);
        }
    });
}
