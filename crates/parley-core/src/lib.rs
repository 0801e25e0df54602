//! Parley Core - Entity and gateway event types for the Parley chat SDK.
//!
//! This crate provides:
//! - Snowflake identifiers and typed id wrappers
//! - Users and reaction emoji
//! - Typed gateway events and the [`Dispatch`] frame decoder
//!
//! Everything here is plain data. Delivery of events lives in
//! `parley-events`, and waiting on them lives in `parley-interactivity`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod emoji;
pub mod event;
pub mod id;
pub mod user;

pub use emoji::{Emoji, EmojiKey};
pub use event::{
    ComponentInteraction, Dispatch, GatewayEvent, MessageCreated, ReactionAdded, ReactionRemoved,
    ReactionsCleared,
};
pub use id::{
    ChannelId, EmojiId, GuildId, InteractionId, MessageId, PLATFORM_EPOCH_MS, Snowflake,
    SnowflakeParseError, UserId,
};
pub use user::User;
