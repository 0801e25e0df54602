//! Mock implementations for testing.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use parley_events::{BusError, BusResult, EventBus, EventSource, Handler, SubscriptionId};
use tokio_util::sync::CancellationToken;

/// An event source that can be told to refuse subscriptions.
///
/// Delivery is backed by a real [`EventBus`]; the mock adds refusal per
/// event type and counts subscribe/unsubscribe calls.
#[derive(Debug, Default)]
pub struct MockEventSource {
    bus: EventBus,
    refused: Mutex<HashSet<TypeId>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl MockEventSource {
    /// Create a new mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every future subscription for events of type `E`.
    #[must_use]
    pub fn refuse<E: 'static>(self) -> Self {
        self.refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<E>());
        self
    }

    /// Publish an event to subscribed handlers.
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) -> usize {
        self.bus.publish(event)
    }

    /// Shut the underlying bus down, cancelling its lifetime.
    pub fn teardown(&self) -> bool {
        self.bus.shutdown()
    }

    /// Total live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Live subscriptions for events of type `E`.
    #[must_use]
    pub fn subscriber_count_for<E: Send + Sync + 'static>(&self) -> usize {
        self.bus.subscriber_count_for::<E>()
    }

    /// Number of `subscribe` calls, refused ones included.
    #[must_use]
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Number of `unsubscribe` calls.
    #[must_use]
    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    fn is_refused<E: 'static>(&self) -> bool {
        self.refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&TypeId::of::<E>())
    }
}

impl<E> EventSource<E> for MockEventSource
where
    E: Send + Sync + 'static,
{
    fn subscribe(&self, handler: Handler<E>) -> BusResult<SubscriptionId> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_refused::<E>() {
            return Err(BusError::Closed);
        }
        self.bus.subscribe_handler(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.bus.unsubscribe(id)
    }

    fn lifetime(&self) -> CancellationToken {
        self.bus.lifetime()
    }
}
