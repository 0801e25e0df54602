//! Reaction collection.
//!
//! A [`ReactionCollector`] subscribes once to the three reaction events and
//! keeps, per outstanding request, a running tally of who reacted with what
//! on the request's target message.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parley_core::{Emoji, MessageId, ReactionAdded, ReactionRemoved, ReactionsCleared, UserId};
use parley_events::{BusResult, EventSource, Handler, SubscriptionId};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{InteractivityError, InteractivityResult};
use crate::request::{RequestId, RequestIds, RequestState, deadline_after, lock};

const COMPONENT: &str = "ReactionCollector";

/// Everyone currently reacting to a message with one emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    emoji: Emoji,
    users: BTreeSet<UserId>,
}

impl Reaction {
    fn new(emoji: Emoji) -> Self {
        Self {
            emoji,
            users: BTreeSet::new(),
        }
    }

    /// The emoji reacted with.
    #[must_use]
    pub fn emoji(&self) -> &Emoji {
        &self.emoji
    }

    /// Reacting users, in id order.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.iter().copied()
    }

    /// Number of reacting users.
    #[must_use]
    pub fn count(&self) -> usize {
        self.users.len()
    }

    /// Whether `user` is among the reactors.
    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.users.contains(&user)
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.emoji, self.users.len())
    }
}

/// Keep one entry per emoji identity. Later entries replace earlier ones in
/// place.
fn dedup_by_emoji(tally: Vec<Reaction>) -> Vec<Reaction> {
    let mut out: Vec<Reaction> = Vec::with_capacity(tally.len());
    for reaction in tally {
        match out.iter_mut().find(|r| r.emoji.same_as(&reaction.emoji)) {
            Some(existing) => *existing = reaction,
            None => out.push(reaction),
        }
    }
    out
}

struct Tally {
    state: RequestState,
    reactions: Vec<Reaction>,
}

/// A windowed reaction tally for one message.
struct ReactionCollectRequest {
    id: RequestId,
    message_id: MessageId,
    deadline: Instant,
    tally: Mutex<Tally>,
}

impl ReactionCollectRequest {
    fn new(id: RequestId, message_id: MessageId, deadline: Instant) -> Self {
        Self {
            id,
            message_id,
            deadline,
            tally: Mutex::new(Tally {
                state: RequestState::Pending,
                reactions: Vec::new(),
            }),
        }
    }

    fn add(&self, user: UserId, emoji: &Emoji) {
        let mut tally = lock(&self.tally);
        if tally.state != RequestState::Pending {
            return;
        }
        match tally.reactions.iter_mut().find(|r| r.emoji.same_as(emoji)) {
            Some(reaction) => {
                reaction.users.insert(user);
            },
            None => {
                let mut reaction = Reaction::new(emoji.clone());
                reaction.users.insert(user);
                tally.reactions.push(reaction);
            },
        }
    }

    fn remove(&self, user: UserId, emoji: &Emoji) {
        let mut tally = lock(&self.tally);
        if tally.state != RequestState::Pending {
            return;
        }
        let Some(index) = tally.reactions.iter().position(|r| r.emoji.same_as(emoji)) else {
            return;
        };
        let now_empty = tally.reactions.get_mut(index).is_some_and(|reaction| {
            reaction.users.remove(&user);
            reaction.users.is_empty()
        });
        if now_empty {
            tally.reactions.remove(index);
        }
    }

    fn clear(&self) {
        let mut tally = lock(&self.tally);
        if tally.state == RequestState::Pending {
            tally.reactions.clear();
        }
    }

    fn snapshot(&self) -> Vec<Reaction> {
        dedup_by_emoji(lock(&self.tally).reactions.clone())
    }

    fn close(&self) -> Vec<Reaction> {
        let mut tally = lock(&self.tally);
        if tally.state == RequestState::Pending {
            tally.state = RequestState::Resolved;
        }
        dedup_by_emoji(std::mem::take(&mut tally.reactions))
    }

    fn dispose(&self) {
        let mut tally = lock(&self.tally);
        tally.reactions.clear();
        tally.state = RequestState::Disposed;
    }

    fn state(&self) -> RequestState {
        lock(&self.tally).state
    }
}

/// Outstanding requests, shared with the three bus handlers.
#[derive(Default)]
struct CollectorShared {
    requests: DashMap<RequestId, Arc<ReactionCollectRequest>>,
    ids: RequestIds,
}

impl CollectorShared {
    fn targeting(&self, message_id: MessageId) -> Vec<Arc<ReactionCollectRequest>> {
        self.requests
            .iter()
            .filter(|entry| entry.value().message_id == message_id)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn on_added(&self, event: &ReactionAdded) {
        for request in self.targeting(event.message_id) {
            trace!(
                request_id = %request.id,
                message_id = %event.message_id,
                user_id = %event.user_id,
                emoji = %event.emoji,
                "Reaction added"
            );
            request.add(event.user_id, &event.emoji);
        }
    }

    fn on_removed(&self, event: &ReactionRemoved) {
        for request in self.targeting(event.message_id) {
            trace!(
                request_id = %request.id,
                message_id = %event.message_id,
                user_id = %event.user_id,
                emoji = %event.emoji,
                "Reaction removed"
            );
            request.remove(event.user_id, &event.emoji);
        }
    }

    fn on_cleared(&self, event: &ReactionsCleared) {
        for request in self.targeting(event.message_id) {
            trace!(request_id = %request.id, message_id = %event.message_id, "Reactions cleared");
            request.clear();
        }
    }
}

/// One live subscription, remembered so it can be released.
struct Subscription<E>
where
    E: Send + Sync + 'static,
{
    source: Arc<dyn EventSource<E>>,
    id: SubscriptionId,
}

impl<E> Subscription<E>
where
    E: Send + Sync + 'static,
{
    fn open<F>(
        source: Arc<dyn EventSource<E>>,
        weak: &Weak<CollectorShared>,
        on_event: F,
    ) -> BusResult<Self>
    where
        F: Fn(&CollectorShared, &E) + Send + Sync + 'static,
    {
        let weak = Weak::clone(weak);
        let handler: Handler<E> = Arc::new(move |event: &Arc<E>| {
            if let Some(shared) = weak.upgrade() {
                on_event(&*shared, &**event);
            }
        });
        let id = source.subscribe(handler)?;
        Ok(Self { source, id })
    }

    fn close(&self) {
        if !self.source.unsubscribe(self.id) {
            debug!(subscription_id = %self.id, "Reaction subscription already gone");
        }
    }
}

/// Collects reactions on target messages over a time window.
///
/// The collector holds exactly one subscription per reaction event type for
/// its whole lifetime, however many requests are outstanding.
pub struct ReactionCollector {
    shared: Arc<CollectorShared>,
    added: Subscription<ReactionAdded>,
    removed: Subscription<ReactionRemoved>,
    cleared: Subscription<ReactionsCleared>,
    lifetime: CancellationToken,
    disposed: AtomicBool,
}

impl ReactionCollector {
    /// Subscribe to the reaction events of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`InteractivityError::Bus`] if any subscription is refused.
    /// Subscriptions already made are released before returning.
    pub fn new<S>(source: &Arc<S>) -> InteractivityResult<Self>
    where
        S: EventSource<ReactionAdded>
            + EventSource<ReactionRemoved>
            + EventSource<ReactionsCleared>
            + 'static,
    {
        let shared = Arc::new(CollectorShared::default());
        let weak = Arc::downgrade(&shared);

        let added_source: Arc<dyn EventSource<ReactionAdded>> = Arc::clone(source) as _;
        let removed_source: Arc<dyn EventSource<ReactionRemoved>> = Arc::clone(source) as _;
        let cleared_source: Arc<dyn EventSource<ReactionsCleared>> = Arc::clone(source) as _;
        let lifetime = added_source.lifetime().child_token();

        let added = Subscription::open(added_source, &weak, CollectorShared::on_added)?;
        let removed = match Subscription::open(removed_source, &weak, CollectorShared::on_removed) {
            Ok(removed) => removed,
            Err(e) => {
                added.close();
                return Err(e.into());
            },
        };
        let cleared = match Subscription::open(cleared_source, &weak, CollectorShared::on_cleared)
        {
            Ok(cleared) => cleared,
            Err(e) => {
                added.close();
                removed.close();
                return Err(e.into());
            },
        };

        debug!(
            added = %added.id,
            removed = %removed.id,
            cleared = %cleared.id,
            "Reaction collector subscribed"
        );

        Ok(Self {
            shared,
            added,
            removed,
            cleared,
            lifetime,
            disposed: AtomicBool::new(false),
        })
    }

    /// Start tallying reactions on `message_id` and return the guard.
    ///
    /// # Errors
    ///
    /// Returns [`InteractivityError::InvalidTimeout`] for a zero or
    /// unrepresentable timeout and [`InteractivityError::Disposed`] after
    /// [`dispose`](Self::dispose).
    pub fn register(
        &self,
        message_id: MessageId,
        timeout: Duration,
    ) -> InteractivityResult<PendingReactions> {
        if self.is_disposed() {
            return Err(InteractivityError::Disposed {
                component: COMPONENT,
            });
        }
        let deadline = deadline_after(timeout)?;
        let id = self.shared.ids.next();
        let request = Arc::new(ReactionCollectRequest::new(id, message_id, deadline));
        self.shared.requests.insert(id, Arc::clone(&request));

        debug!(request_id = %id, message_id = %message_id, ?timeout, "Reaction request registered");

        Ok(PendingReactions {
            request,
            shared: Arc::clone(&self.shared),
            lifetime: self.lifetime.clone(),
        })
    }

    /// Tally reactions on `message_id` until `timeout` elapses.
    ///
    /// Returns one [`Reaction`] per emoji that still has at least one
    /// reactor when the window closes.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub async fn collect(
        &self,
        message_id: MessageId,
        timeout: Duration,
    ) -> InteractivityResult<Vec<Reaction>> {
        let pending = self.register(message_id, timeout)?;
        Ok(pending.wait().await)
    }

    /// Release all three subscriptions and end every outstanding request.
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

    /// Number of outstanding requests.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.requests.len()
    }

    fn release(&self) {
        self.lifetime.cancel();
        self.added.close();
        self.removed.close();
        self.cleared.close();
        self.shared.requests.clear();
        debug!("Reaction collector disposed");
    }
}

impl Drop for ReactionCollector {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.release();
        }
    }
}

impl fmt::Debug for ReactionCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionCollector")
            .field("pending", &self.pending())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// A registered reaction tally.
///
/// Dropping the guard removes the request from its collector.
#[must_use = "a reaction request is removed as soon as its guard is dropped"]
pub struct PendingReactions {
    request: Arc<ReactionCollectRequest>,
    shared: Arc<CollectorShared>,
    lifetime: CancellationToken,
}

impl PendingReactions {
    /// Id of the underlying request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.request.id
    }

    /// The message being tallied.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.request.message_id
    }

    /// Current state of the underlying request.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.request.state()
    }

    /// The tally as it stands now.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Reaction> {
        self.request.snapshot()
    }

    /// Suspend until the window closes, then return the final tally.
    pub async fn wait(self) -> Vec<Reaction> {
        let id = self.request.id;
        let message_id = self.request.message_id;
        tokio::select! {
            biased;
            () = sleep_until(self.request.deadline) => {}
            () = self.lifetime.cancelled() => {
                warn!(
                    request_id = %id,
                    message_id = %message_id,
                    "Reaction source torn down during collect; returning partial tally"
                );
            }
        }

        let reactions = self.request.close();
        debug!(
            request_id = %id,
            message_id = %message_id,
            emoji = reactions.len(),
            "Reaction request finished"
        );
        reactions
    }
}

impl Drop for PendingReactions {
    fn drop(&mut self) {
        self.request.close();
        self.shared.requests.remove(&self.request.id);
        self.request.dispose();
    }
}

impl fmt::Debug for PendingReactions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReactions")
            .field("id", &self.request.id)
            .field("message_id", &self.request.message_id)
            .field("state", &self.request.state())
            .finish_non_exhaustive()
    }
}
