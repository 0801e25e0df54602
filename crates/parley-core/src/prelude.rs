//! Prelude module - commonly used types for convenient import.
//!
//! Use `use parley_core::prelude::*;` to import all essential types.

// Identifiers
pub use crate::{ChannelId, EmojiId, GuildId, InteractionId, MessageId, Snowflake, UserId};

// Entities
pub use crate::{Emoji, EmojiKey, User};

// Gateway events
pub use crate::{
    ComponentInteraction, Dispatch, GatewayEvent, MessageCreated, ReactionAdded, ReactionRemoved,
    ReactionsCleared,
};
