//! Gateway event models.
//!
//! Each struct is one event type on the typed event bus. [`Dispatch`] is the
//! decoded form of a gateway dispatch frame (`{"t": ..., "d": ...}`) and is
//! how raw gateway traffic is turned into typed events.

use serde::{Deserialize, Serialize};

use crate::emoji::Emoji;
use crate::id::{ChannelId, GuildId, InteractionId, MessageId, UserId};
use crate::user::User;

/// A typed gateway event.
pub trait GatewayEvent: Send + Sync + 'static {
    /// Gateway dispatch name, used as the `event_type` log field.
    const NAME: &'static str;

    /// Gateway dispatch name.
    fn name() -> &'static str {
        Self::NAME
    }
}

macro_rules! gateway_event {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(impl GatewayEvent for $ty {
            const NAME: &'static str = $name;
        })*
    };
}

/// A message was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreated {
    /// Message id.
    pub id: MessageId,
    /// Channel the message was posted in.
    pub channel_id: ChannelId,
    /// Guild, if the channel belongs to one.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Message author.
    pub author: User,
    /// Text content.
    #[serde(default)]
    pub content: String,
}

/// A user reacted to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAdded {
    /// The message reacted to.
    pub message_id: MessageId,
    /// Channel containing the message.
    pub channel_id: ChannelId,
    /// Guild, if any.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// The reacting user.
    pub user_id: UserId,
    /// The emoji used.
    pub emoji: Emoji,
}

/// A user withdrew a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRemoved {
    /// The message the reaction was on.
    pub message_id: MessageId,
    /// Channel containing the message.
    pub channel_id: ChannelId,
    /// Guild, if any.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// The user whose reaction was removed.
    pub user_id: UserId,
    /// The emoji removed.
    pub emoji: Emoji,
}

/// Every reaction on a message was removed at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionsCleared {
    /// The cleared message.
    pub message_id: MessageId,
    /// Channel containing the message.
    pub channel_id: ChannelId,
    /// Guild, if any.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
}

/// A user pressed a button or used a select menu attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInteraction {
    /// Interaction id.
    pub id: InteractionId,
    /// Message the component is attached to.
    pub message_id: MessageId,
    /// Channel containing the message.
    pub channel_id: ChannelId,
    /// The user who interacted.
    pub user: User,
    /// Developer-defined component id.
    pub custom_id: String,
    /// Selected values for select menus; empty for buttons.
    #[serde(default)]
    pub values: Vec<String>,
}

/// A decoded gateway dispatch frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "d", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dispatch {
    /// `MESSAGE_CREATE`
    MessageCreate(MessageCreated),
    /// `MESSAGE_REACTION_ADD`
    MessageReactionAdd(ReactionAdded),
    /// `MESSAGE_REACTION_REMOVE`
    MessageReactionRemove(ReactionRemoved),
    /// `MESSAGE_REACTION_REMOVE_ALL`
    MessageReactionRemoveAll(ReactionsCleared),
    /// `INTERACTION_CREATE`
    InteractionCreate(ComponentInteraction),
}

gateway_event! {
    MessageCreated => "MESSAGE_CREATE",
    ReactionAdded => "MESSAGE_REACTION_ADD",
    ReactionRemoved => "MESSAGE_REACTION_REMOVE",
    ReactionsCleared => "MESSAGE_REACTION_REMOVE_ALL",
    ComponentInteraction => "INTERACTION_CREATE",
}

impl Dispatch {
    /// Gateway name of the dispatch.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageCreate(_) => MessageCreated::NAME,
            Self::MessageReactionAdd(_) => ReactionAdded::NAME,
            Self::MessageReactionRemove(_) => ReactionRemoved::NAME,
            Self::MessageReactionRemoveAll(_) => ReactionsCleared::NAME,
            Self::InteractionCreate(_) => ComponentInteraction::NAME,
        }
    }

    /// Decode a dispatch frame from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed or names an event type
    /// this crate does not model.
    pub fn from_json(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}
