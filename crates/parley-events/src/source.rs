//! The typed subscription seam consumed by the interactivity layer.

use tokio_util::sync::CancellationToken;

use crate::error::BusResult;
use crate::subscriber::{Handler, SubscriptionId};

/// A source of events of type `E`.
///
/// [`EventBus`](crate::EventBus) implements this for every event type.
/// Consumers hold an `Arc<dyn EventSource<E>>` so they can be driven by any
/// dispatcher, including test doubles.
pub trait EventSource<E>: Send + Sync
where
    E: Send + Sync + 'static,
{
    /// Register `handler` to be invoked once per delivered event.
    ///
    /// # Errors
    ///
    /// Returns an error if the source no longer accepts subscriptions.
    fn subscribe(&self, handler: Handler<E>) -> BusResult<SubscriptionId>;

    /// Remove a handler. Returns `true` if it was registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Token cancelled when the source is torn down.
    fn lifetime(&self) -> CancellationToken;
}
