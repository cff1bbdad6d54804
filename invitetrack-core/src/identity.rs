//! Identity types for invitetrack entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier for rows owned by the store (joins, custom invites).
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type RecordId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 RecordId (timestamp-sortable).
pub fn new_record_id() -> RecordId {
    Uuid::now_v7()
}

/// Error when parsing a snowflake id from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnowflakeParseError(pub String);

impl fmt::Display for SnowflakeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid snowflake id: {}", self.0)
    }
}

impl std::error::Error for SnowflakeParseError {}

/// Macro to define a strongly-typed Discord snowflake id.
///
/// # Example
/// ```ignore
/// define_snowflake_id!(GuildId, "A community (guild) the bot is a member of.");
/// let guild = GuildId::new(81384788765712384);
/// assert_eq!(guild.get(), 81384788765712384);
/// ```
macro_rules! define_snowflake_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw snowflake.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw snowflake value.
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = SnowflakeParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| SnowflakeParseError(s.to_string()))
            }
        }
    };
}

define_snowflake_id!(GuildId, "A community (guild) the bot is a member of.");
define_snowflake_id!(MemberId, "A user, scoped to the guilds they are a member of.");
define_snowflake_id!(RoleId, "A guild role.");
define_snowflake_id!(ChannelId, "A guild channel.");
define_snowflake_id!(MessageId, "A message posted in a channel.");

impl MemberId {
    /// Mention markup for this member.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl RoleId {
    /// Mention markup for this role.
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.0)
    }
}

impl ChannelId {
    /// Mention markup for this channel.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_parse_and_display() {
        let guild: GuildId = "81384788765712384".parse().unwrap();
        assert_eq!(guild.get(), 81384788765712384);
        assert_eq!(guild.to_string(), "81384788765712384");
        assert!("not-a-number".parse::<GuildId>().is_err());
    }

    #[test]
    fn test_mentions() {
        assert_eq!(MemberId::new(7).mention(), "<@7>");
        assert_eq!(RoleId::new(8).mention(), "<@&8>");
        assert_eq!(ChannelId::new(9).mention(), "<#9>");
    }

    #[test]
    fn test_snowflake_serde_is_transparent() {
        let json = serde_json::to_string(&RoleId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: RoleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RoleId::new(42));
    }

    #[test]
    fn test_record_ids_are_time_sortable() {
        let a = new_record_id();
        let b = new_record_id();
        assert!(a <= b);
    }
}
