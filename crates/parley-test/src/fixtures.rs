//! Test fixtures for gateway events.

use parley_core::{
    ChannelId, ComponentInteraction, Emoji, EmojiId, GuildId, InteractionId, MessageCreated,
    MessageId, ReactionAdded, ReactionRemoved, ReactionsCleared, User, UserId,
};

/// Channel used by fixtures unless told otherwise.
pub const TEST_CHANNEL: ChannelId = ChannelId::new(1_000);

/// Guild used by fixtures.
pub const TEST_GUILD: GuildId = GuildId::new(2_000);

/// A message id for reaction and button fixtures.
pub const TEST_MESSAGE: MessageId = MessageId::new(3_000);

/// Create a test user.
#[must_use]
pub fn test_user(id: u64) -> User {
    User::new(UserId::new(id), format!("user{id}"))
}

/// Create a test bot user.
#[must_use]
pub fn test_bot(id: u64) -> User {
    User::new(UserId::new(id), format!("bot{id}")).as_bot()
}

/// The `👍` emoji.
#[must_use]
pub fn thumbs_up() -> Emoji {
    Emoji::unicode("👍")
}

/// The `😀` emoji.
#[must_use]
pub fn grinning() -> Emoji {
    Emoji::unicode("😀")
}

/// A custom emoji.
#[must_use]
pub fn custom_emoji(id: u64, name: &str) -> Emoji {
    Emoji::custom(EmojiId::new(id), name)
}

/// A message posted by user `author` in `channel`.
#[must_use]
pub fn message_created(
    id: u64,
    channel: ChannelId,
    author: u64,
    content: &str,
) -> MessageCreated {
    MessageCreated {
        id: MessageId::new(id),
        channel_id: channel,
        guild_id: Some(TEST_GUILD),
        author: test_user(author),
        content: content.to_owned(),
    }
}

/// User `user` reacted to `message` with `emoji`.
#[must_use]
pub fn reaction_added(message: MessageId, user: u64, emoji: Emoji) -> ReactionAdded {
    ReactionAdded {
        message_id: message,
        channel_id: TEST_CHANNEL,
        guild_id: Some(TEST_GUILD),
        user_id: UserId::new(user),
        emoji,
    }
}

/// User `user` withdrew their `emoji` reaction from `message`.
#[must_use]
pub fn reaction_removed(message: MessageId, user: u64, emoji: Emoji) -> ReactionRemoved {
    ReactionRemoved {
        message_id: message,
        channel_id: TEST_CHANNEL,
        guild_id: Some(TEST_GUILD),
        user_id: UserId::new(user),
        emoji,
    }
}

/// All reactions on `message` were removed.
#[must_use]
pub fn reactions_cleared(message: MessageId) -> ReactionsCleared {
    ReactionsCleared {
        message_id: message,
        channel_id: TEST_CHANNEL,
        guild_id: Some(TEST_GUILD),
    }
}

/// User `user` pressed the button `custom_id` on `message`.
#[must_use]
pub fn button_press(
    id: u64,
    message: MessageId,
    user: u64,
    custom_id: &str,
) -> ComponentInteraction {
    ComponentInteraction {
        id: InteractionId::new(id),
        message_id: message,
        channel_id: TEST_CHANNEL,
        user: test_user(user),
        custom_id: custom_id.to_owned(),
        values: Vec::new(),
    }
}
