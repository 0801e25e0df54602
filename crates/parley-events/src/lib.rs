//! Parley Events - Typed event bus for the Parley chat SDK.
//!
//! This crate provides:
//! - A typed, synchronous event bus keyed by event type
//! - The [`EventSource`] trait the interactivity layer subscribes through
//! - Routing of decoded gateway [`Dispatch`](parley_core::Dispatch) frames
//!
//! # Architecture
//!
//! Handlers are registered per event type and invoked synchronously from
//! [`EventBus::publish`], in registration order. Events are wrapped in an
//! `Arc` once, so every handler sees the same allocation.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parley_core::{ChannelId, Emoji, MessageId, ReactionAdded, UserId};
//! use parley_events::EventBus;
//!
//! let bus = EventBus::new();
//!
//! let id = bus
//!     .subscribe(|event: &Arc<ReactionAdded>| {
//!         println!("{} reacted with {}", event.user_id, event.emoji);
//!     })
//!     .expect("bus is open");
//!
//! let delivered = bus.publish(ReactionAdded {
//!     message_id: MessageId::new(1),
//!     channel_id: ChannelId::new(2),
//!     guild_id: None,
//!     user_id: UserId::new(3),
//!     emoji: Emoji::unicode("👍"),
//! });
//! assert_eq!(delivered, 1);
//!
//! assert!(bus.unsubscribe(id));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod error;
mod source;
mod subscriber;

pub use bus::EventBus;
pub use error::{BusError, BusResult};
pub use source::EventSource;
pub use subscriber::{Handler, SubscriberRegistry, SubscriptionId};
