//! The interactivity facade.
//!
//! [`Interactivity`] owns one [`EventWaiter`] per event type, created on
//! first use, and one [`ReactionCollector`], so any number of concurrent
//! waits share a single bus subscription per event type.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use parley_core::{
    ChannelId, ComponentInteraction, MessageCreated, MessageId, ReactionAdded, UserId,
};
use parley_events::{BusError, EventBus, EventSource};
use tracing::debug;

use crate::config::InteractivityConfig;
use crate::error::{InteractivityError, InteractivityResult};
use crate::reaction::{PendingReactions, Reaction, ReactionCollector};
use crate::request::lock;
use crate::waiter::{EventWaiter, PendingCollect, PendingMatch};

const COMPONENT: &str = "Interactivity";

/// Type-erased view of an `EventWaiter<T>`.
trait AnyWaiter: Send + Sync {
    fn close(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T> AnyWaiter for EventWaiter<T>
where
    T: Send + Sync + 'static,
{
    fn close(&self) {
        // Already disposed is fine here.
        let _ = self.dispose();
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Waits for and collects gateway events published on an [`EventBus`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use parley_core::{ChannelId, MessageCreated, MessageId, User, UserId};
/// use parley_events::EventBus;
/// use parley_interactivity::Interactivity;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = Arc::new(EventBus::new());
/// let interactivity = Interactivity::new(bus.clone());
///
/// let pending = interactivity.register_match(
///     |m: &MessageCreated| m.content == "yes",
///     Some(Duration::from_secs(30)),
/// )?;
///
/// bus.publish(MessageCreated {
///     id: MessageId::new(1),
///     channel_id: ChannelId::new(2),
///     guild_id: None,
///     author: User::new(UserId::new(3), "alice"),
///     content: "yes".to_owned(),
/// });
///
/// let reply = pending.wait().await.expect("reply arrived");
/// assert_eq!(reply.author.username, "alice");
/// # Ok(())
/// # }
/// ```
pub struct Interactivity {
    bus: Arc<EventBus>,
    config: InteractivityConfig,
    waiters: DashMap<TypeId, Arc<dyn AnyWaiter>>,
    reactions: Mutex<Option<Arc<ReactionCollector>>>,
    shut_down: AtomicBool,
}

impl Interactivity {
    /// Create a facade over `bus` with default settings.
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self::with_config(bus, InteractivityConfig::default())
    }

    /// Create a facade over `bus` with explicit settings.
    #[must_use]
    pub fn with_config(bus: Arc<EventBus>, config: InteractivityConfig) -> Self {
        Self {
            bus,
            config,
            waiters: DashMap::new(),
            reactions: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    /// The settings in use.
    #[must_use]
    pub fn config(&self) -> &InteractivityConfig {
        &self.config
    }

    /// The bus events are read from.
    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Number of event types with a live waiter.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    /// Register a match request for the next `T` satisfying `predicate`.
    ///
    /// `None` uses the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`InteractivityError::Disposed`] after shutdown,
    /// [`InteractivityError::InvalidTimeout`] for an unusable timeout, and
    /// [`InteractivityError::Bus`] if the bus refuses the first subscription
    /// for `T`.
    pub fn register_match<T, F>(
        &self,
        predicate: F,
        timeout: Option<Duration>,
    ) -> InteractivityResult<PendingMatch<T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.waiter::<T>()?
            .register_match(predicate, self.timeout_or_default(timeout))
    }

    /// Wait for the next `T` satisfying `predicate`.
    ///
    /// Resolves to `None` on timeout or teardown.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn wait_for<T, F>(
        &self,
        predicate: F,
        timeout: Option<Duration>,
    ) -> InteractivityResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let pending = self.register_match(predicate, timeout)?;
        Ok(pending.wait().await)
    }

    /// Register a collect request for every `T` satisfying `predicate`.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub fn register_collect<T, F>(
        &self,
        predicate: F,
        timeout: Option<Duration>,
    ) -> InteractivityResult<PendingCollect<T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.waiter::<T>()?
            .register_collect(predicate, self.timeout_or_default(timeout))
    }

    /// Collect every `T` satisfying `predicate` until the window closes.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn collect<T, F>(
        &self,
        predicate: F,
        timeout: Option<Duration>,
    ) -> InteractivityResult<Vec<Arc<T>>>
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let pending = self.register_collect(predicate, timeout)?;
        Ok(pending.wait().await)
    }

    /// Start tallying reactions on `message_id`.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub fn register_reactions(
        &self,
        message_id: MessageId,
        timeout: Option<Duration>,
    ) -> InteractivityResult<PendingReactions> {
        self.reaction_collector()?
            .register(message_id, self.timeout_or_default(timeout))
    }

    /// Tally reactions on `message_id` until the window closes.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn collect_reactions(
        &self,
        message_id: MessageId,
        timeout: Option<Duration>,
    ) -> InteractivityResult<Vec<Reaction>> {
        let pending = self.register_reactions(message_id, timeout)?;
        Ok(pending.wait().await)
    }

    /// Wait for a message satisfying `predicate`.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn wait_for_message<F>(
        &self,
        predicate: F,
        timeout: Option<Duration>,
    ) -> InteractivityResult<Option<Arc<MessageCreated>>>
    where
        F: Fn(&MessageCreated) -> bool + Send + Sync + 'static,
    {
        self.wait_for(predicate, timeout).await
    }

    /// Wait for the next message `user` posts in `channel`.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn wait_for_message_from(
        &self,
        channel: ChannelId,
        user: UserId,
        timeout: Option<Duration>,
    ) -> InteractivityResult<Option<Arc<MessageCreated>>> {
        self.wait_for_message(
            move |m| m.channel_id == channel && m.author.id == user,
            timeout,
        )
        .await
    }

    /// Wait for `user` to react to `message`.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn wait_for_reaction(
        &self,
        message: MessageId,
        user: UserId,
        timeout: Option<Duration>,
    ) -> InteractivityResult<Option<Arc<ReactionAdded>>> {
        self.wait_for(
            move |r: &ReactionAdded| r.message_id == message && r.user_id == user,
            timeout,
        )
        .await
    }

    /// Wait for `user` to press a component on `message`.
    ///
    /// # Errors
    ///
    /// See [`register_match`](Self::register_match).
    pub async fn wait_for_button(
        &self,
        message: MessageId,
        user: UserId,
        timeout: Option<Duration>,
    ) -> InteractivityResult<Option<Arc<ComponentInteraction>>> {
        self.wait_for(
            move |i: &ComponentInteraction| i.message_id == message && i.user.id == user,
            timeout,
        )
        .await
    }

    /// Dispose every waiter and the reaction collector.
    ///
    /// Outstanding waits end immediately with an empty or partial result.
    ///
    /// # Errors
    ///
    /// Returns [`InteractivityError::AlreadyDisposed`] on a second call.
    pub fn shutdown(&self) -> InteractivityResult<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Err(InteractivityError::AlreadyDisposed {
                component: COMPONENT,
            });
        }
        self.release();
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.timeout)
    }

    fn ensure_live(&self) -> InteractivityResult<()> {
        if self.is_shut_down() {
            return Err(InteractivityError::Disposed {
                component: COMPONENT,
            });
        }
        // Cached waiters would otherwise accept requests that can never match.
        if self.bus.is_closed() {
            return Err(BusError::Closed.into());
        }
        Ok(())
    }

    fn waiter<T>(&self) -> InteractivityResult<Arc<EventWaiter<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.ensure_live()?;
        let erased = {
            let entry = self
                .waiters
                .entry(TypeId::of::<T>())
                .or_try_insert_with(|| {
                    let source: Arc<dyn EventSource<T>> = Arc::clone(&self.bus) as _;
                    let waiter = EventWaiter::new(source)?;
                    debug!(event_type = type_name::<T>(), "Created event waiter");
                    Ok::<_, InteractivityError>(Arc::new(waiter) as Arc<dyn AnyWaiter>)
                })?;
            Arc::clone(entry.value())
        };
        // `shutdown` may have cleared the map between `ensure_live` and the
        // insert above.
        if self.is_shut_down() {
            self.waiters.remove(&TypeId::of::<T>());
            erased.close();
            return Err(InteractivityError::Disposed {
                component: COMPONENT,
            });
        }
        // Entries are keyed by the waiter's own event type.
        erased
            .into_any()
            .downcast::<EventWaiter<T>>()
            .map_err(|_| InteractivityError::Disposed {
                component: COMPONENT,
            })
    }

    fn reaction_collector(&self) -> InteractivityResult<Arc<ReactionCollector>> {
        self.ensure_live()?;
        let mut slot = lock(&self.reactions);
        // `release` takes this lock after setting the flag.
        if self.is_shut_down() {
            return Err(InteractivityError::Disposed {
                component: COMPONENT,
            });
        }
        if let Some(collector) = slot.as_ref() {
            return Ok(Arc::clone(collector));
        }
        let collector = Arc::new(ReactionCollector::new(&self.bus)?);
        debug!("Created reaction collector");
        *slot = Some(Arc::clone(&collector));
        Ok(collector)
    }

    fn release(&self) {
        let waiters: Vec<_> = self
            .waiters
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.waiters.clear();
        for waiter in waiters {
            waiter.close();
        }

        if let Some(collector) = lock(&self.reactions).take() {
            // Already disposed is fine here.
            let _ = collector.dispose();
        }
        debug!("Interactivity shut down");
    }
}

impl Drop for Interactivity {
    fn drop(&mut self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            self.release();
        }
    }
}

impl fmt::Debug for Interactivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interactivity")
            .field("config", &self.config)
            .field("waiters", &self.waiter_count())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
