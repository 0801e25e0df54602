//! Snowflake identifiers and the typed id wrappers built on them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Milliseconds between the Unix epoch and the platform epoch (2015-01-01).
pub const PLATFORM_EPOCH_MS: u64 = 1_420_070_400_000;

/// Number of low bits holding worker, process and increment fields.
const TIMESTAMP_SHIFT: u32 = 22;

/// Error returned when a snowflake cannot be parsed from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid snowflake '{input}': expected an unsigned decimal integer")]
pub struct SnowflakeParseError {
    /// The rejected input.
    pub input: String,
}

/// A 64-bit platform identifier.
///
/// The upper 42 bits carry the creation time in milliseconds since
/// [`PLATFORM_EPOCH_MS`]. On the wire snowflakes are decimal strings, but
/// integer encodings are accepted when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Create a snowflake from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw 64-bit value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Creation time encoded in the snowflake.
    ///
    /// Returns `None` if the encoded time does not fit a `DateTime`.
    #[must_use]
    pub fn timestamp(self) -> Option<DateTime<Utc>> {
        let ms = self
            .0
            .checked_shr(TIMESTAMP_SHIFT)?
            .checked_add(PLATFORM_EPOCH_MS)?;
        DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self).map_err(|_| SnowflakeParseError {
            input: s.to_string(),
        })
    }
}

impl From<u64> for Snowflake {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct SnowflakeVisitor;

impl Visitor<'_> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake as a decimal string or unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Snowflake(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(Snowflake)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Snowflake);

        impl $name {
            /// Create an id from its raw snowflake value.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(Snowflake(raw))
            }

            /// Raw 64-bit value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = SnowflakeParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self::new(raw)
            }
        }
    };
}

typed_id!(
    /// Identifies a user account.
    UserId
);
typed_id!(
    /// Identifies a message.
    MessageId
);
typed_id!(
    /// Identifies a text or voice channel.
    ChannelId
);
typed_id!(
    /// Identifies a guild (server).
    GuildId
);
typed_id!(
    /// Identifies a custom emoji.
    EmojiId
);
typed_id!(
    /// Identifies an interaction.
    InteractionId
);
