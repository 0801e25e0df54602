//! Event bus for delivering typed gateway events to handlers.

use std::any::type_name;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parley_core::Dispatch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{BusError, BusResult};
use crate::source::EventSource;
use crate::subscriber::{Handler, SubscriberRegistry, SubscriptionId};

/// Event bus delivering each published event to every handler registered
/// for its type.
///
/// Handlers run synchronously inside [`publish`](Self::publish), in
/// registration order. Clones share the same registry and lifetime.
///
/// **WARNING:** Storing a cloned `EventBus` (or anything holding one strongly)
/// inside a handler creates an `Arc` reference cycle through the registry.
/// Handlers that need to reach back into their owner should hold a
/// `std::sync::Weak`.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Handlers keyed by event type.
    registry: Arc<SubscriberRegistry>,
    /// Set once by `shutdown`.
    closed: Arc<AtomicBool>,
    /// Cancelled on shutdown so that in-flight waits observe teardown.
    lifetime: CancellationToken,
}

impl EventBus {
    /// Create a new event bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
            closed: Arc::new(AtomicBool::new(false)),
            lifetime: CancellationToken::new(),
        }
    }

    /// Register a handler for events of type `E`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the bus has been shut down.
    pub fn subscribe<E, F>(&self, handler: F) -> BusResult<SubscriptionId>
    where
        E: Send + Sync + 'static,
        F: Fn(&Arc<E>) + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    /// Register an already boxed handler for events of type `E`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the bus has been shut down.
    pub fn subscribe_handler<E>(&self, handler: Handler<E>) -> BusResult<SubscriptionId>
    where
        E: Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        let id = self.registry.register(handler);
        // A concurrent `shutdown` may have cleared the registry before the
        // insert landed.
        if self.is_closed() {
            self.registry.unregister(id);
            return Err(BusError::Closed);
        }
        Ok(id)
    }

    /// Remove a handler. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unregister(id)
    }

    /// Publish an event to every handler registered for its type.
    ///
    /// Returns the number of handlers that were invoked.
    pub fn publish<E>(&self, event: E) -> usize
    where
        E: Send + Sync + 'static,
    {
        self.publish_shared(Arc::new(event))
    }

    /// Publish an event that is already shared.
    ///
    /// Every handler observes the same allocation, so handlers can compare
    /// events by identity with [`Arc::ptr_eq`].
    pub fn publish_shared<E>(&self, event: Arc<E>) -> usize
    where
        E: Send + Sync + 'static,
    {
        trace!(event_type = type_name::<E>(), "Publishing event");
        let count = self.registry.notify(&event);
        if count == 0 {
            trace!(event_type = type_name::<E>(), "No handlers for event");
        }
        count
    }

    /// Publish a decoded gateway dispatch as its typed event.
    pub fn publish_dispatch(&self, dispatch: Dispatch) -> usize {
        debug!(event_type = dispatch.event_type(), "Dispatching gateway event");
        match dispatch {
            Dispatch::MessageCreate(e) => self.publish(e),
            Dispatch::MessageReactionAdd(e) => self.publish(e),
            Dispatch::MessageReactionRemove(e) => self.publish(e),
            Dispatch::MessageReactionRemoveAll(e) => self.publish(e),
            Dispatch::InteractionCreate(e) => self.publish(e),
        }
    }

    /// Shut the bus down.
    ///
    /// Drops every handler, rejects future subscriptions and cancels the
    /// bus lifetime token. Returns `false` if the bus was already shut down.
    pub fn shutdown(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.registry.clear();
        self.lifetime.cancel();
        debug!("Event bus shut down");
        true
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Token cancelled when the bus shuts down.
    #[must_use]
    pub fn lifetime(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of handlers registered for `E`.
    #[must_use]
    pub fn subscriber_count_for<E: 'static>(&self) -> usize {
        self.registry.len_for::<E>()
    }

    /// Get the handler registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventSource<E> for EventBus
where
    E: Send + Sync + 'static,
{
    fn subscribe(&self, handler: Handler<E>) -> BusResult<SubscriptionId> {
        self.subscribe_handler(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        Self::unsubscribe(self, id)
    }

    fn lifetime(&self) -> CancellationToken {
        Self::lifetime(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{ChannelId, Emoji, MessageId, ReactionAdded, ReactionsCleared, UserId};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn reaction() -> ReactionAdded {
        ReactionAdded {
            message_id: MessageId::new(1),
            channel_id: ChannelId::new(2),
            guild_id: None,
            user_id: UserId::new(3),
            emoji: Emoji::unicode("👍"),
        }
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        bus.subscribe(move |e: &Arc<ReactionAdded>| {
            sink.lock().unwrap().push(e.user_id);
        })
        .unwrap();

        assert_eq!(bus.publish(reaction()), 1);
        assert_eq!(*seen.lock().unwrap(), vec![UserId::new(3)]);
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(reaction()), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_handlers_share_one_allocation() {
        let bus = EventBus::new();
        let seen: Arc<Mutex<Vec<Arc<ReactionAdded>>>> = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let sink = Arc::clone(&seen);
            bus.subscribe(move |e: &Arc<ReactionAdded>| {
                sink.lock().unwrap().push(Arc::clone(e));
            })
            .unwrap();
        }

        bus.publish(reaction());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(Arc::ptr_eq(&seen[0], &seen[1]));
    }

    #[tokio::test]
    async fn test_publish_dispatch_routes_by_type() {
        let bus = EventBus::new();
        let added = Arc::new(AtomicUsize::new(0));
        let cleared = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&added);
        bus.subscribe(move |_: &Arc<ReactionAdded>| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let c = Arc::clone(&cleared);
        bus.subscribe(move |_: &Arc<ReactionsCleared>| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        bus.publish_dispatch(Dispatch::MessageReactionAdd(reaction()));
        bus.publish_dispatch(Dispatch::MessageReactionRemoveAll(ReactionsCleared {
            message_id: MessageId::new(1),
            channel_id: ChannelId::new(2),
            guild_id: None,
        }));

        assert_eq!(added.load(Ordering::SeqCst), 1);
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cloned_bus_shares_registry() {
        let bus = EventBus::new();
        let cloned = bus.clone();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);

        cloned
            .subscribe(move |_: &Arc<ReactionAdded>| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        bus.publish(reaction());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_subscriptions_and_cancels_lifetime() {
        let bus = EventBus::new();
        let lifetime = bus.lifetime();
        bus.subscribe(|_: &Arc<ReactionAdded>| {}).unwrap();

        assert!(bus.shutdown());
        assert!(!bus.shutdown());
        assert!(bus.is_closed());
        assert!(lifetime.is_cancelled());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.subscribe(|_: &Arc<ReactionAdded>| {}),
            Err(BusError::Closed)
        );
        assert_eq!(bus.publish(reaction()), 0);
    }

    #[test]
    fn test_subscribe_racing_shutdown_leaves_no_handler() {
        for _ in 0..50 {
            let bus = EventBus::new();
            let subscribers: Vec<_> = (0..4)
                .map(|_| {
                    let bus = bus.clone();
                    std::thread::spawn(move || {
                        while bus.subscribe(|_: &Arc<ReactionAdded>| {}).is_ok() {}
                    })
                })
                .collect();

            std::thread::yield_now();
            bus.shutdown();
            for subscriber in subscribers {
                subscriber.join().unwrap();
            }

            assert_eq!(bus.subscriber_count(), 0);
            assert_eq!(bus.publish(reaction()), 0);
        }
    }

    #[tokio::test]
    async fn test_reentrant_unsubscribe_from_handler() {
        let bus = EventBus::new();
        let my_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let registry = Arc::clone(&bus.registry);
        let slot = Arc::clone(&my_id);
        let id = bus
            .subscribe(move |_: &Arc<ReactionAdded>| {
                let id = slot.lock().unwrap().expect("id not set");
                // Must not deadlock against the registry lock.
                registry.unregister(id);
            })
            .unwrap();
        *my_id.lock().unwrap() = Some(id);

        bus.publish(reaction());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
