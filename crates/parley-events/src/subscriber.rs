//! Typed handler registry.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Callback invoked for every published event of type `E`.
///
/// Handlers run synchronously on the publisher's thread and should return
/// quickly.
pub type Handler<E> = Arc<dyn Fn(&Arc<E>) + Send + Sync>;

/// Registration handle for a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// One registered handler. The handler is stored type-erased and is always
/// a `Handler<E>` for the `TypeId` it is filed under.
struct Registration {
    id: SubscriptionId,
    handler: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct Slots {
    /// Handlers per event type, in registration order.
    by_type: HashMap<TypeId, Vec<Registration>>,
    /// Reverse index used by `unregister`.
    owners: HashMap<SubscriptionId, TypeId>,
}

/// Registry of synchronous handlers keyed by event type.
#[derive(Default)]
pub struct SubscriberRegistry {
    slots: RwLock<Slots>,
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscriber_count", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events of type `E`.
    ///
    /// Returns a handle that can be used to unregister the handler.
    pub fn register<E>(&self, handler: Handler<E>) -> SubscriptionId
    where
        E: Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let type_id = TypeId::of::<E>();

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.by_type.entry(type_id).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
        });
        slots.owners.insert(id, type_id);
        drop(slots);

        debug!(subscription_id = %id, event_type = type_name::<E>(), "Handler registered");
        id
    }

    /// Unregister a handler.
    ///
    /// Returns `true` if the handler was found and removed.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
            let Some(type_id) = slots.owners.remove(&id) else {
                return false;
            };
            let mut removed = None;
            let mut now_empty = false;
            if let Some(list) = slots.by_type.get_mut(&type_id) {
                if let Some(pos) = list.iter().position(|r| r.id == id) {
                    removed = Some(list.remove(pos));
                }
                now_empty = list.is_empty();
            }
            if now_empty {
                slots.by_type.remove(&type_id);
            }
            removed
        };

        // The handler is dropped after the write lock is released, so a
        // handler whose drop publishes or unregisters cannot deadlock.
        let found = removed.is_some();
        drop(removed);

        if found {
            debug!(subscription_id = %id, "Handler unregistered");
        }
        found
    }

    /// Invoke every handler registered for `E`, in registration order.
    ///
    /// The handler list is snapshotted first, so handlers may register or
    /// unregister re-entrantly. A panicking handler is logged and does not
    /// prevent the remaining handlers from running.
    ///
    /// Returns the number of handlers invoked.
    pub fn notify<E>(&self, event: &Arc<E>) -> usize
    where
        E: Send + Sync + 'static,
    {
        let handlers: Vec<(SubscriptionId, Handler<E>)> = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            slots
                .by_type
                .get(&TypeId::of::<E>())
                .map(|list| {
                    list.iter()
                        .filter_map(|r| {
                            r.handler
                                .downcast_ref::<Handler<E>>()
                                .map(|h| (r.id, Arc::clone(h)))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        for (id, handler) in &handlers {
            trace!(subscription_id = %id, event_type = type_name::<E>(), "Notifying handler");

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(event);
            }));

            if let Err(e) = result {
                warn!(
                    subscription_id = %id,
                    event_type = type_name::<E>(),
                    error = ?e,
                    "Handler panicked"
                );
            }
        }

        handlers.len()
    }

    /// Number of handlers registered for `E`.
    #[must_use]
    pub fn len_for<E: 'static>(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_type
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .owners
            .len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every handler.
    pub fn clear(&self) {
        let drained = {
            let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *slots)
        };
        drop(drained);
        debug!("All handlers cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Ping;

    #[derive(Debug)]
    struct Pong;

    fn counting_handler<E: Send + Sync + 'static>(counter: &Arc<AtomicUsize>) -> Handler<E> {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &Arc<E>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_registry_register_unregister() {
        let registry = SubscriberRegistry::new();
        assert!(registry.is_empty());

        let counter = Arc::new(AtomicUsize::new(0));
        let id = registry.register::<Ping>(counting_handler(&counter));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.len_for::<Ping>(), 1);
        assert_eq!(registry.len_for::<Pong>(), 0);

        assert!(registry.unregister(id));
        assert!(registry.is_empty());
        assert!(!registry.unregister(id));
    }

    #[test]
    fn test_notify_only_reaches_matching_type() {
        let registry = SubscriberRegistry::new();
        let pings = Arc::new(AtomicUsize::new(0));
        let pongs = Arc::new(AtomicUsize::new(0));
        registry.register::<Ping>(counting_handler(&pings));
        registry.register::<Pong>(counting_handler(&pongs));

        assert_eq!(registry.notify(&Arc::new(Ping)), 1);
        assert_eq!(registry.notify(&Arc::new(Ping)), 1);

        assert_eq!(pings.load(Ordering::SeqCst), 2);
        assert_eq!(pongs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_notify_in_registration_order() {
        let registry = SubscriberRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.register::<Ping>(Arc::new(move |_: &Arc<Ping>| order.lock().unwrap().push(tag)));
        }

        registry.notify(&Arc::new(Ping));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_others() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.register::<Ping>(Arc::new(|_: &Arc<Ping>| panic!("boom")));
        registry.register::<Ping>(counting_handler(&counter));

        assert_eq!(registry.notify(&Arc::new(Ping)), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register::<Ping>(counting_handler(&counter));
        registry.register::<Pong>(counting_handler(&counter));
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.notify(&Arc::new(Ping)), 0);
    }

    #[test]
    fn test_unregister_nonexistent() {
        let registry = SubscriberRegistry::new();
        assert!(!registry.unregister(SubscriptionId::new()));
    }
}
