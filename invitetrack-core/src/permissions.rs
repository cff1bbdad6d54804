//! Guild permission bits, as carried by roles.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The subset of guild permission bits the promotion engine inspects.
    ///
    /// Bit positions match the platform's permission integer, so values read
    /// from the gateway can be passed through `from_bits_truncate`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        const KICK_MEMBERS = 1 << 1;
        const BAN_MEMBERS = 1 << 2;
        const ADMINISTRATOR = 1 << 3;
        const MANAGE_CHANNELS = 1 << 4;
        const MANAGE_GUILD = 1 << 5;
        const ADD_REACTIONS = 1 << 6;
        const SEND_MESSAGES = 1 << 11;
        const EMBED_LINKS = 1 << 14;
        const MANAGE_ROLES = 1 << 28;
    }
}

impl Permissions {
    /// Whether these bits grant guild-management power that automatic
    /// promotion must never hand out.
    pub fn is_elevated(&self) -> bool {
        self.intersects(Permissions::ADMINISTRATOR | Permissions::MANAGE_GUILD)
    }

    /// Whether these bits allow managing roles. Administrators implicitly can.
    pub fn can_manage_roles(&self) -> bool {
        self.intersects(Permissions::ADMINISTRATOR | Permissions::MANAGE_ROLES)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

// Manual serde implementation (bitflags 2.x + serde): the raw integer on the wire
impl Serialize for Permissions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u64::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}
