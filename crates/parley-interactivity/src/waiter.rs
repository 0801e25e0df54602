//! Generic event waiter.
//!
//! An [`EventWaiter<T>`] holds one subscription on its event source and fans
//! every `T` out to the match and collect requests currently registered on
//! it. Requests are registered through guards ([`PendingMatch`],
//! [`PendingCollect`]) that remove and dispose the request when dropped, so
//! cleanup happens on every exit path of the wait.

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parley_events::{EventSource, Handler, SubscriptionId};
use tokio::sync::oneshot;
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{InteractivityError, InteractivityResult};
use crate::request::{
    CollectRequest, MatchOutcome, MatchRequest, Predicate, RequestId, RequestIds, RequestState,
    deadline_after,
};

const COMPONENT: &str = "EventWaiter";

/// Request sets shared between the waiter, its bus handler and its guards.
struct WaiterShared<T> {
    matches: DashMap<RequestId, Arc<MatchRequest<T>>>,
    collects: DashMap<RequestId, Arc<CollectRequest<T>>>,
    ids: RequestIds,
}

impl<T> WaiterShared<T> {
    fn new() -> Self {
        Self {
            matches: DashMap::new(),
            collects: DashMap::new(),
            ids: RequestIds::default(),
        }
    }

    /// Offer an event to every registered request.
    ///
    /// Works on a snapshot so predicates never run under a shard lock and
    /// requests may be added or removed while the event is being offered.
    fn dispatch(&self, event: &Arc<T>) {
        let matches: Vec<_> = self
            .matches
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for request in matches {
            if request.offer(event) {
                trace!(
                    request_id = %request.id(),
                    event_type = type_name::<T>(),
                    "Match request resolved"
                );
            }
        }

        let collects: Vec<_> = self
            .collects
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for request in collects {
            if request.offer(event) {
                trace!(
                    request_id = %request.id(),
                    event_type = type_name::<T>(),
                    "Event collected"
                );
            }
        }
    }

    fn clear(&self) {
        for entry in &self.matches {
            entry.value().resolve_empty();
        }
        self.matches.clear();
        self.collects.clear();
    }
}

/// Waits for, or collects, events of type `T` from an [`EventSource`].
///
/// Any number of requests can be outstanding at once; they share a single
/// subscription. Timing out or cancelling one request never affects another.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use parley_events::EventBus;
/// use parley_interactivity::EventWaiter;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = Arc::new(EventBus::new());
/// let waiter = EventWaiter::<u64>::new(bus.clone())?;
///
/// let pending = waiter.register_match(|n: &u64| *n == 42, Duration::from_secs(2))?;
/// bus.publish(7_u64);
/// bus.publish(42_u64);
///
/// assert_eq!(pending.wait().await.as_deref(), Some(&42));
/// # Ok(())
/// # }
/// ```
pub struct EventWaiter<T>
where
    T: Send + Sync + 'static,
{
    shared: Arc<WaiterShared<T>>,
    source: Arc<dyn EventSource<T>>,
    subscription: SubscriptionId,
    lifetime: CancellationToken,
    disposed: AtomicBool,
}

impl<T> EventWaiter<T>
where
    T: Send + Sync + 'static,
{
    /// Subscribe to `source` and start routing its events to requests.
    ///
    /// # Errors
    ///
    /// Returns [`InteractivityError::Bus`] if the source refuses the
    /// subscription.
    pub fn new(source: Arc<dyn EventSource<T>>) -> InteractivityResult<Self> {
        let shared = Arc::new(WaiterShared::new());

        // The handler lives in the source's registry; a strong reference here
        // would keep the request sets alive after the waiter is gone.
        let weak: Weak<WaiterShared<T>> = Arc::downgrade(&shared);
        let handler: Handler<T> = Arc::new(move |event: &Arc<T>| {
            if let Some(shared) = weak.upgrade() {
                shared.dispatch(event);
            }
        });

        let subscription = source.subscribe(handler)?;
        let lifetime = source.lifetime().child_token();

        debug!(
            subscription_id = %subscription,
            event_type = type_name::<T>(),
            "Event waiter subscribed"
        );

        Ok(Self {
            shared,
            source,
            subscription,
            lifetime,
            disposed: AtomicBool::new(false),
        })
    }

    /// Register a match request and return its guard.
    ///
    /// The request is live as soon as this returns, so events published
    /// before [`PendingMatch::wait`] is polled are not missed.
    ///
    /// # Errors
    ///
    /// Returns [`InteractivityError::InvalidTimeout`] for a zero or
    /// unrepresentable timeout and [`InteractivityError::Disposed`] after
    /// [`dispose`](Self::dispose).
    pub fn register_match<F>(
        &self,
        predicate: F,
        timeout: Duration,
    ) -> InteractivityResult<PendingMatch<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.ensure_live()?;
        let deadline = deadline_after(timeout)?;
        let id = self.shared.ids.next();
        let predicate: Predicate<T> = Box::new(predicate);
        let (request, receiver) = MatchRequest::new(id, predicate, deadline);
        let request = Arc::new(request);
        self.shared.matches.insert(id, Arc::clone(&request));

        debug!(
            request_id = %id,
            event_type = type_name::<T>(),
            ?timeout,
            "Match request registered"
        );

        Ok(PendingMatch {
            request,
            receiver,
            shared: Arc::clone(&self.shared),
            lifetime: self.lifetime.clone(),
        })
    }

    /// Wait for the first event satisfying `predicate`.
    ///
    /// Resolves to `None` when `timeout` elapses first, or when the waiter or
    /// its source is torn down during the wait.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn wait_for_match<F>(
        &self,
        predicate: F,
        timeout: Duration,
    ) -> InteractivityResult<Option<Arc<T>>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let pending = self.register_match(predicate, timeout)?;
        Ok(pending.wait().await)
    }

    /// Register a collect request and return its guard.
    ///
    /// # Errors
    ///
    /// Same as [`register_match`](Self::register_match).
    pub fn register_collect<F>(
        &self,
        predicate: F,
        timeout: Duration,
    ) -> InteractivityResult<PendingCollect<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.ensure_live()?;
        let deadline = deadline_after(timeout)?;
        let id = self.shared.ids.next();
        let predicate: Predicate<T> = Box::new(predicate);
        let request = Arc::new(CollectRequest::new(id, predicate, deadline));
        self.shared.collects.insert(id, Arc::clone(&request));

        debug!(
            request_id = %id,
            event_type = type_name::<T>(),
            ?timeout,
            "Collect request registered"
        );

        Ok(PendingCollect {
            request,
            shared: Arc::clone(&self.shared),
            lifetime: self.lifetime.clone(),
        })
    }

    /// Collect every event satisfying `predicate` until `timeout` elapses.
    ///
    /// Each distinct event appears once, in arrival order. If the waiter is
    /// torn down first, whatever was collected so far is returned.
    ///
    /// # Errors
    ///
    /// See [`register_collect`](Self::register_collect).
    pub async fn collect<F>(
        &self,
        predicate: F,
        timeout: Duration,
    ) -> InteractivityResult<Vec<Arc<T>>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let pending = self.register_collect(predicate, timeout)?;
        Ok(pending.wait().await)
    }

    /// Offer an event to every outstanding request.
    ///
    /// The source subscription calls this for each published event. It can
    /// also be called directly to feed events from elsewhere. Ignored once
    /// disposed.
    pub fn dispatch(&self, event: &Arc<T>) {
        if self.is_disposed() {
            return;
        }
        self.shared.dispatch(event);
    }

    /// Unsubscribe from the source and release every outstanding request.
    ///
    /// Outstanding waits return immediately with an empty outcome (match)
    /// or what they had accumulated (collect).
    ///
    /// # Errors
    ///
    /// Returns [`InteractivityError::AlreadyDisposed`] on a second call.
    pub fn dispose(&self) -> InteractivityResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Err(InteractivityError::AlreadyDisposed {
                component: COMPONENT,
            });
        }
        self.release();
        Ok(())
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of outstanding match requests.
    #[must_use]
    pub fn pending_matches(&self) -> usize {
        self.shared.matches.len()
    }

    /// Number of outstanding collect requests.
    #[must_use]
    pub fn pending_collects(&self) -> usize {
        self.shared.collects.len()
    }

    /// The subscription this waiter holds on its source.
    #[must_use]
    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription
    }

    fn ensure_live(&self) -> InteractivityResult<()> {
        if self.is_disposed() {
            return Err(InteractivityError::Disposed {
                component: COMPONENT,
            });
        }
        Ok(())
    }

    fn release(&self) {
        self.lifetime.cancel();
        if !self.source.unsubscribe(self.subscription) {
            // Source shut down first and already dropped the handler.
            debug!(
                subscription_id = %self.subscription,
                "Event waiter subscription already gone"
            );
        }
        self.shared.clear();
        debug!(
            subscription_id = %self.subscription,
            event_type = type_name::<T>(),
            "Event waiter disposed"
        );
    }
}

impl<T> Drop for EventWaiter<T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.release();
        }
    }
}

impl<T> fmt::Debug for EventWaiter<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWaiter")
            .field("event_type", &type_name::<T>())
            .field("subscription", &self.subscription)
            .field("pending_matches", &self.pending_matches())
            .field("pending_collects", &self.pending_collects())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Why a match wait woke without a delivered result.
enum Stop {
    Elapsed,
    TornDown,
}

/// A registered match request.
///
/// Dropping the guard removes the request from its waiter, whether or not
/// [`wait`](Self::wait) ever ran.
#[must_use = "a match request is removed as soon as its guard is dropped"]
pub struct PendingMatch<T> {
    request: Arc<MatchRequest<T>>,
    receiver: oneshot::Receiver<MatchOutcome<T>>,
    shared: Arc<WaiterShared<T>>,
    lifetime: CancellationToken,
}

impl<T> PendingMatch<T>
where
    T: Send + Sync + 'static,
{
    /// Id of the underlying request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.request.id()
    }

    /// Current state of the underlying request.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.request.state()
    }

    /// A handle that resolves this request empty from elsewhere.
    #[must_use]
    pub fn canceller(&self) -> MatchCanceller<T> {
        MatchCanceller {
            request: Arc::downgrade(&self.request),
        }
    }

    /// Suspend until a matching event arrives, the deadline passes, or the
    /// waiter is torn down.
    pub async fn wait(mut self) -> Option<Arc<T>> {
        let id = self.request.id();
        let stop = tokio::select! {
            biased;
            received = &mut self.receiver => {
                return received.ok().flatten();
            }
            () = sleep_until(self.request.deadline()) => Stop::Elapsed,
            () = self.lifetime.cancelled() => Stop::TornDown,
        };

        match stop {
            Stop::Elapsed => {
                debug!(request_id = %id, event_type = type_name::<T>(), "Match request timed out");
            },
            Stop::TornDown => {
                warn!(
                    request_id = %id,
                    event_type = type_name::<T>(),
                    "Event source torn down during wait; treating as timeout"
                );
            },
        }

        // A match may have landed between the wake-up and now; whichever
        // settled first is what the receiver holds.
        self.request.resolve_empty();
        self.receiver.try_recv().ok().flatten()
    }
}

impl<T> Drop for PendingMatch<T> {
    fn drop(&mut self) {
        self.request.resolve_empty();
        self.shared.matches.remove(&self.request.id());
        self.request.dispose();
    }
}

impl<T> fmt::Debug for PendingMatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMatch")
            .field("id", &self.request.id())
            .field("state", &self.request.state())
            .finish_non_exhaustive()
    }
}

/// Cancels one match request.
///
/// Holds the request weakly; cancelling after the request finished does
/// nothing.
pub struct MatchCanceller<T> {
    request: Weak<MatchRequest<T>>,
}

impl<T> MatchCanceller<T> {
    /// Resolve the request empty. Returns `false` if it had already resolved
    /// or been released.
    pub fn cancel(&self) -> bool {
        let Some(request) = self.request.upgrade() else {
            return false;
        };
        let cancelled = request.resolve_empty();
        if cancelled {
            debug!(request_id = %request.id(), "Match request cancelled");
        }
        cancelled
    }
}

impl<T> Clone for MatchCanceller<T> {
    fn clone(&self) -> Self {
        Self {
            request: Weak::clone(&self.request),
        }
    }
}

impl<T> fmt::Debug for MatchCanceller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchCanceller")
            .field("live", &(self.request.strong_count() > 0))
            .finish()
    }
}

/// A registered collect request.
///
/// Dropping the guard removes the request from its waiter.
#[must_use = "a collect request is removed as soon as its guard is dropped"]
pub struct PendingCollect<T> {
    request: Arc<CollectRequest<T>>,
    shared: Arc<WaiterShared<T>>,
    lifetime: CancellationToken,
}

impl<T> PendingCollect<T>
where
    T: Send + Sync + 'static,
{
    /// Id of the underlying request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.request.id()
    }

    /// Current state of the underlying request.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.request.state()
    }

    /// Number of events collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.request.len()
    }

    /// Whether nothing has been collected yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Suspend until the window closes, then return what was collected.
    pub async fn wait(self) -> Vec<Arc<T>> {
        let id = self.request.id();
        tokio::select! {
            biased;
            () = sleep_until(self.request.deadline()) => {
                trace!(request_id = %id, event_type = type_name::<T>(), "Collect window closed");
            }
            () = self.lifetime.cancelled() => {
                warn!(
                    request_id = %id,
                    event_type = type_name::<T>(),
                    collected = self.request.len(),
                    "Event source torn down during collect; returning partial result"
                );
            }
        }

        let items = self.request.close();
        debug!(
            request_id = %id,
            event_type = type_name::<T>(),
            collected = items.len(),
            "Collect request finished"
        );
        items
    }
}

impl<T> Drop for PendingCollect<T> {
    fn drop(&mut self) {
        self.request.close();
        self.shared.collects.remove(&self.request.id());
        self.request.dispose();
    }
}

impl<T> fmt::Debug for PendingCollect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCollect")
            .field("id", &self.request.id())
            .field("state", &self.request.state())
            .field("collected", &self.request.len())
            .finish_non_exhaustive()
    }
}
