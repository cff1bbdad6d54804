//! Guild-scoped member key.
//!
//! `MemberKey` can only be built with a guild, so per-member cache entries
//! can never leak across guilds.

use invitetrack_core::{GuildId, MemberId};
use std::fmt;

use super::traits::GuildScoped;

/// Key for per-member cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    guild_id: GuildId,
    member_id: MemberId,
}

impl MemberKey {
    /// Create a member key. This is the only constructor.
    pub fn new(guild_id: GuildId, member_id: MemberId) -> Self {
        Self {
            guild_id,
            member_id,
        }
    }

    /// Get the member this key refers to.
    pub fn member_id(&self) -> MemberId {
        self.member_id
    }
}

impl GuildScoped for MemberKey {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guild_id, self.member_id)
    }
}
