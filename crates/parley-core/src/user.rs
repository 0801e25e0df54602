//! User accounts.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// A platform user as seen in gateway payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Account name.
    pub username: String,
    /// Whether the account belongs to a bot.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Create a human user.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            bot: false,
        }
    }

    /// Mark the user as a bot account.
    #[must_use]
    pub fn as_bot(mut self) -> Self {
        self.bot = true;
        self
    }

    /// Mention markup for the user.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}
