//! Integration tests for match and collect waits driven through the bus.
//!
//! All tests run on paused time, so elapsed durations are exact.

#![allow(clippy::arithmetic_side_effects)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use parley_core::{Dispatch, MessageCreated};
use parley_events::EventSource;
use parley_interactivity::{EventWaiter, Interactivity, RequestState};
use tokio::time::Instant;

use common::{bus, message, publish_later};

fn waiter_on(bus: &Arc<parley_events::EventBus>) -> EventWaiter<MessageCreated> {
    let source: Arc<dyn EventSource<MessageCreated>> = Arc::clone(bus) as _;
    EventWaiter::new(source).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_match_resolves_with_the_dispatched_event() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    let pending = waiter
        .register_match(|m: &MessageCreated| m.id.get() == 42, Duration::from_secs(2))
        .unwrap();
    assert_eq!(waiter.pending_matches(), 1);

    publish_later(
        &bus,
        vec![
            (Duration::from_millis(200), message(7)),
            (Duration::from_millis(500), message(42)),
        ],
    );

    let start = Instant::now();
    let event = pending.wait().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(event.id.get(), 42);
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(waiter.pending_matches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_first_match_is_kept() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    let pending = waiter
        .register_match(|_: &MessageCreated| true, Duration::from_secs(5))
        .unwrap();

    let first = Arc::new(message(1));
    bus.publish_shared(Arc::clone(&first));
    bus.publish(message(2));
    bus.publish(message(3));

    let delivered = pending.wait().await.unwrap();
    assert!(Arc::ptr_eq(&delivered, &first));
}

#[tokio::test(start_paused = true)]
async fn test_match_times_out_no_earlier_than_its_timeout() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    publish_later(&bus, vec![(Duration::from_millis(300), message(7))]);

    let start = Instant::now();
    let outcome = waiter
        .wait_for_match(|m: &MessageCreated| m.id.get() == 42, Duration::from_secs(1))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(outcome.is_none());
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1_100));
    assert_eq!(waiter.pending_matches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_identical_requests_resolve_to_the_same_instance() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    let a = waiter
        .register_match(|m: &MessageCreated| m.id.get() == 9, Duration::from_secs(2))
        .unwrap();
    let b = waiter
        .register_match(|m: &MessageCreated| m.id.get() == 9, Duration::from_secs(2))
        .unwrap();

    publish_later(&bus, vec![(Duration::from_millis(100), message(9))]);

    let (a, b) = futures::future::join(a.wait(), b.wait()).await;
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(waiter.pending_matches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelling_one_request_leaves_the_other_pending() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    let cancelled = waiter
        .register_match(|_: &MessageCreated| true, Duration::from_secs(2))
        .unwrap();
    let survivor = waiter
        .register_match(|_: &MessageCreated| true, Duration::from_secs(2))
        .unwrap();

    assert!(cancelled.canceller().cancel());
    assert_eq!(cancelled.state(), RequestState::Resolved);
    assert_eq!(survivor.state(), RequestState::Pending);
    assert!(cancelled.wait().await.is_none());

    bus.publish(message(5));
    assert_eq!(survivor.wait().await.unwrap().id.get(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_of_one_request_does_not_affect_another() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    let short = waiter
        .register_match(|_: &MessageCreated| true, Duration::from_millis(100))
        .unwrap();
    let long = waiter
        .register_match(|_: &MessageCreated| true, Duration::from_secs(2))
        .unwrap();

    publish_later(&bus, vec![(Duration::from_millis(500), message(8))]);

    let (short, long) = futures::future::join(short.wait(), long.wait()).await;
    assert!(short.is_none());
    assert_eq!(long.unwrap().id.get(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_collect_gathers_everything_within_the_window() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    let pending = waiter
        .register_collect(|_: &MessageCreated| true, Duration::from_secs(1))
        .unwrap();

    publish_later(
        &bus,
        vec![
            (Duration::from_millis(100), message(1)),
            (Duration::from_millis(300), message(2)),
            (Duration::from_millis(900), message(3)),
            (Duration::from_millis(1_200), message(4)),
        ],
    );

    let start = Instant::now();
    let collected = pending.wait().await;

    assert!(start.elapsed() >= Duration::from_secs(1));
    let ids: Vec<u64> = collected.iter().map(|m| m.id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(waiter.pending_collects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_collect_keeps_distinct_matching_events_only() {
    let bus = bus();
    let waiter = waiter_on(&bus);

    let pending = waiter
        .register_collect(
            |m: &MessageCreated| m.content == "hello",
            Duration::from_secs(1),
        )
        .unwrap();

    let repeated = Arc::new(message(1));
    bus.publish_shared(Arc::clone(&repeated));
    bus.publish_shared(Arc::clone(&repeated));
    bus.publish(parley_test::message_created(
        2,
        parley_test::TEST_CHANNEL,
        1,
        "other",
    ));
    bus.publish(message(1));
    assert_eq!(pending.len(), 2);

    let collected = pending.wait().await;
    assert_eq!(collected.len(), 2);
    assert!(Arc::ptr_eq(&collected[0], &repeated));
    assert!(!Arc::ptr_eq(&collected[1], &repeated));
}

#[tokio::test(start_paused = true)]
async fn test_gateway_frames_reach_waiters() {
    let bus = bus();
    let interactivity = Interactivity::new(Arc::clone(&bus));

    let pending = interactivity
        .register_match(
            |m: &MessageCreated| m.content == "ping",
            Some(Duration::from_secs(1)),
        )
        .unwrap();

    let frame = r#"{
        "t": "MESSAGE_CREATE",
        "d": {
            "id": "11",
            "channel_id": "1000",
            "author": {"id": "5", "username": "alice"},
            "content": "ping"
        }
    }"#;
    assert_eq!(bus.publish_dispatch(Dispatch::from_json(frame).unwrap()), 1);

    let reply = pending.wait().await.unwrap();
    assert_eq!(reply.author.username, "alice");
}

#[tokio::test(start_paused = true)]
async fn test_bus_shutdown_ends_outstanding_waits() {
    let bus = bus();
    let interactivity = Interactivity::new(Arc::clone(&bus));

    let matched = interactivity
        .register_match(|_: &MessageCreated| true, Some(Duration::from_secs(60)))
        .unwrap();
    let collected = interactivity
        .register_collect(|_: &MessageCreated| true, Some(Duration::from_secs(60)))
        .unwrap();
    bus.publish(message(1));

    let closer = Arc::clone(&bus);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        closer.shutdown();
    });

    let start = Instant::now();
    let (matched, collected) = futures::future::join(matched.wait(), collected.wait()).await;

    // The match resolved on the first message, before shutdown.
    assert_eq!(matched.unwrap().id.get(), 1);
    assert_eq!(collected.len(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}
