//! Emoji used in reactions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::EmojiId;

/// A reaction emoji.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Emoji {
    /// A standard unicode emoji such as `👍`.
    Unicode {
        /// The emoji itself.
        name: String,
    },
    /// A guild-uploaded emoji.
    Custom {
        /// Emoji id.
        id: EmojiId,
        /// Name at the time the event was produced. May be stale.
        name: String,
        /// Whether the emoji is animated.
        #[serde(default)]
        animated: bool,
    },
}

/// The identity of an emoji.
///
/// Custom emoji are identified by id alone, since their names can change;
/// unicode emoji are identified by their text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmojiKey {
    /// Identity of a unicode emoji.
    Unicode(String),
    /// Identity of a custom emoji.
    Custom(EmojiId),
}

impl Emoji {
    /// Create a unicode emoji.
    #[must_use]
    pub fn unicode(name: impl Into<String>) -> Self {
        Self::Unicode { name: name.into() }
    }

    /// Create a static custom emoji.
    #[must_use]
    pub fn custom(id: EmojiId, name: impl Into<String>) -> Self {
        Self::Custom {
            id,
            name: name.into(),
            animated: false,
        }
    }

    /// The emoji's identity.
    #[must_use]
    pub fn key(&self) -> EmojiKey {
        match self {
            Self::Unicode { name } => EmojiKey::Unicode(name.clone()),
            Self::Custom { id, .. } => EmojiKey::Custom(*id),
        }
    }

    /// Whether two emoji denote the same emoji, ignoring stale names.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unicode { name: a }, Self::Unicode { name: b }) => a == b,
            (Self::Custom { id: a, .. }, Self::Custom { id: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Display name, without any markup.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unicode { name } | Self::Custom { name, .. } => name,
        }
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicode { name } => f.write_str(name),
            Self::Custom {
                id,
                name,
                animated: true,
            } => write!(f, "<a:{name}:{id}>"),
            Self::Custom { id, name, .. } => write!(f, "<:{name}:{id}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_identity_ignores_name() {
        let before = Emoji::custom(EmojiId::new(7), "party");
        let after = Emoji::custom(EmojiId::new(7), "partyparrot");
        assert!(before.same_as(&after));
        assert_eq!(before.key(), after.key());
        assert_ne!(before, after);
    }

    #[test]
    fn test_unicode_and_custom_never_match() {
        let unicode = Emoji::unicode("party");
        let custom = Emoji::custom(EmojiId::new(7), "party");
        assert!(!unicode.same_as(&custom));
        assert_ne!(unicode.key(), custom.key());
    }

    #[test]
    fn test_display() {
        assert_eq!(Emoji::unicode("👍").to_string(), "👍");
        assert_eq!(
            Emoji::custom(EmojiId::new(12), "wave").to_string(),
            "<:wave:12>"
        );
        let animated = Emoji::Custom {
            id: EmojiId::new(12),
            name: "wave".to_string(),
            animated: true,
        };
        assert_eq!(animated.to_string(), "<a:wave:12>");
    }
}
