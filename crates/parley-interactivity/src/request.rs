//! Match and collect requests.
//!
//! A request moves through `Pending -> Resolved -> Disposed`. Every path,
//! including timeout and cancellation, passes through `Resolved` before the
//! owning guard disposes it.

use std::any::type_name;
use std::collections::HashSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{InteractivityError, InteractivityResult};

/// Predicate deciding whether an event satisfies a request.
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Identifies a request within the waiter or collector that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// Monotonic request id issuer.
#[derive(Debug, Default)]
pub(crate) struct RequestIds(AtomicU64);

impl RequestIds {
    pub(crate) fn next(&self) -> RequestId {
        RequestId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Registered and accepting events.
    Pending,
    /// Matched, timed out, cancelled or window closed. Accepts nothing.
    Resolved,
    /// Released by its owner.
    Disposed,
}

/// Compute the deadline for a request starting now.
pub(crate) fn deadline_after(timeout: Duration) -> InteractivityResult<Instant> {
    if timeout.is_zero() {
        return Err(InteractivityError::InvalidTimeout { timeout });
    }
    Instant::now()
        .checked_add(timeout)
        .ok_or(InteractivityError::InvalidTimeout { timeout })
}

/// Run a caller predicate, treating a panic as "no match".
pub(crate) fn evaluate<T>(id: RequestId, predicate: &Predicate<T>, event: &T) -> bool {
    match catch_unwind(AssertUnwindSafe(|| predicate(event))) {
        Ok(matched) => matched,
        Err(e) => {
            warn!(
                request_id = %id,
                event_type = type_name::<T>(),
                error = ?e,
                "Request predicate panicked; treating as no match"
            );
            false
        },
    }
}

pub(crate) fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Value carried by a match request's result slot. `None` means the request
/// was resolved empty (timeout or cancellation).
pub(crate) type MatchOutcome<T> = Option<Arc<T>>;

struct MatchSlot<T> {
    state: RequestState,
    sender: Option<oneshot::Sender<MatchOutcome<T>>>,
}

/// A single-shot subscription to the next event satisfying a predicate.
pub(crate) struct MatchRequest<T> {
    id: RequestId,
    predicate: Predicate<T>,
    deadline: Instant,
    slot: Mutex<MatchSlot<T>>,
}

impl<T> MatchRequest<T> {
    pub(crate) fn new(
        id: RequestId,
        predicate: Predicate<T>,
        deadline: Instant,
    ) -> (Self, oneshot::Receiver<MatchOutcome<T>>) {
        let (sender, receiver) = oneshot::channel();
        let request = Self {
            id,
            predicate,
            deadline,
            slot: Mutex::new(MatchSlot {
                state: RequestState::Pending,
                sender: Some(sender),
            }),
        };
        (request, receiver)
    }

    pub(crate) fn id(&self) -> RequestId {
        self.id
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    pub(crate) fn state(&self) -> RequestState {
        lock(&self.slot).state
    }

    /// Offer an event. Returns `true` if this call resolved the request.
    pub(crate) fn offer(&self, event: &Arc<T>) -> bool {
        if self.state() != RequestState::Pending {
            return false;
        }
        if !evaluate(self.id, &self.predicate, event) {
            return false;
        }
        self.settle(Some(Arc::clone(event)))
    }

    /// Resolve with no event. Returns `false` if already resolved.
    pub(crate) fn resolve_empty(&self) -> bool {
        self.settle(None)
    }

    fn settle(&self, outcome: MatchOutcome<T>) -> bool {
        let mut slot = lock(&self.slot);
        if slot.state != RequestState::Pending {
            return false;
        }
        slot.state = RequestState::Resolved;
        if let Some(sender) = slot.sender.take() {
            // The receiver is gone only if the guard is already being dropped.
            let _ = sender.send(outcome);
        }
        true
    }

    /// Move a resolved request to `Disposed`.
    pub(crate) fn dispose(&self) {
        let mut slot = lock(&self.slot);
        if slot.state == RequestState::Pending {
            slot.state = RequestState::Resolved;
        }
        slot.sender = None;
        slot.state = RequestState::Disposed;
    }
}

struct CollectSlot<T> {
    state: RequestState,
    items: Vec<Arc<T>>,
    /// Addresses of `items`, which keep them alive and therefore unique.
    seen: HashSet<usize>,
}

fn identity<T>(event: &Arc<T>) -> usize {
    Arc::as_ptr(event) as usize
}

/// A time-boxed subscription accumulating every event that satisfies a
/// predicate.
pub(crate) struct CollectRequest<T> {
    id: RequestId,
    predicate: Predicate<T>,
    deadline: Instant,
    slot: Mutex<CollectSlot<T>>,
}

impl<T> CollectRequest<T> {
    pub(crate) fn new(id: RequestId, predicate: Predicate<T>, deadline: Instant) -> Self {
        Self {
            id,
            predicate,
            deadline,
            slot: Mutex::new(CollectSlot {
                state: RequestState::Pending,
                items: Vec::new(),
                seen: HashSet::new(),
            }),
        }
    }

    pub(crate) fn id(&self) -> RequestId {
        self.id
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    pub(crate) fn state(&self) -> RequestState {
        lock(&self.slot).state
    }

    /// Number of events collected so far.
    pub(crate) fn len(&self) -> usize {
        lock(&self.slot).items.len()
    }

    /// Offer an event. Returns `true` if it was appended.
    ///
    /// The same event instance is appended at most once.
    pub(crate) fn offer(&self, event: &Arc<T>) -> bool {
        if self.state() != RequestState::Pending {
            return false;
        }
        if !evaluate(self.id, &self.predicate, event) {
            return false;
        }
        let mut slot = lock(&self.slot);
        if slot.state != RequestState::Pending || !slot.seen.insert(identity(event)) {
            return false;
        }
        slot.items.push(Arc::clone(event));
        true
    }

    /// Close the window and take what was collected.
    ///
    /// Once closed, `offer` appends nothing. Closing twice yields an empty
    /// second result.
    pub(crate) fn close(&self) -> Vec<Arc<T>> {
        let mut slot = lock(&self.slot);
        if slot.state == RequestState::Pending {
            slot.state = RequestState::Resolved;
        }
        slot.seen.clear();
        std::mem::take(&mut slot.items)
    }

    /// Move the request to `Disposed`, closing it first if needed.
    pub(crate) fn dispose(&self) {
        let mut slot = lock(&self.slot);
        if slot.state == RequestState::Pending {
            slot.state = RequestState::Resolved;
        }
        slot.items.clear();
        slot.seen.clear();
        slot.state = RequestState::Disposed;
    }
}
