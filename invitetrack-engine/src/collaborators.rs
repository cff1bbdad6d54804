//! Collaborators the engine drives but does not own.
//!
//! The chat platform sits behind these traits: reading guild roles and
//! members, mutating member roles, and posting announcements. Tests use the
//! recording implementations in `invitetrack-test-utils`.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use invitetrack_core::{
    ChannelId, CollaboratorError, GuildId, GuildRole, InviteResult, MemberDisplay, MemberId,
    MessageId, RoleId,
};

use crate::template::{fill_template, RenderedMessage, TemplateVars};

/// Snapshot of a guild's roles, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct GuildRoles {
    roles: HashMap<RoleId, GuildRole>,
}

impl GuildRoles {
    pub fn new(roles: impl IntoIterator<Item = GuildRole>) -> Self {
        Self {
            roles: roles.into_iter().map(|role| (role.id, role)).collect(),
        }
    }

    pub fn get(&self, role_id: RoleId) -> Option<&GuildRole> {
        self.roles.get(&role_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GuildRole> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Highest positioned role among `ids` that exists in this guild.
    pub fn highest_of<'a>(&self, ids: impl IntoIterator<Item = &'a RoleId>) -> Option<&GuildRole> {
        let mut highest: Option<&GuildRole> = None;
        for role in ids.into_iter().filter_map(|id| self.get(*id)) {
            if highest.map_or(true, |h| h.position < role.position) {
                highest = Some(role);
            }
        }
        highest
    }
}

/// A member as seen by the platform at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub id: MemberId,
    pub display: MemberDisplay,
    pub avatar_url: Option<String>,
    pub role_ids: BTreeSet<RoleId>,
}

/// The bot's own membership in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BotMember {
    pub role_ids: Vec<RoleId>,
    pub has_manage_roles: bool,
}

/// Read access to guild roles and members.
#[async_trait]
pub trait GuildRoleProvider: Send + Sync {
    async fn guild_roles(&self, guild_id: GuildId) -> InviteResult<GuildRoles>;

    async fn member(&self, guild_id: GuildId, member_id: MemberId) -> InviteResult<MemberSnapshot>;

    async fn bot_member(&self, guild_id: GuildId) -> InviteResult<BotMember>;
}

/// Grants and revokes member roles. `reason` ends up in the audit log.
#[async_trait]
pub trait RoleMutator: Send + Sync {
    async fn grant_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), CollaboratorError>;

    async fn revoke_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Posts rank announcements.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Whether `channel_id` is still a postable channel in the guild.
    async fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> InviteResult<bool>;

    /// Render an announcement template. Override for platform specific
    /// placeholders.
    async fn render(
        &self,
        _guild_id: GuildId,
        template: &str,
        vars: &TemplateVars,
    ) -> InviteResult<RenderedMessage> {
        Ok(fill_template(template, vars)?)
    }

    async fn send(
        &self,
        channel_id: ChannelId,
        message: &RenderedMessage,
    ) -> Result<MessageId, CollaboratorError>;

    async fn add_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<(), CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use invitetrack_core::Permissions;

    fn role(id: u64, position: i32) -> GuildRole {
        GuildRole {
            id: RoleId::new(id),
            name: format!("role-{id}"),
            position,
            permissions: Permissions::empty(),
        }
    }

    #[test]
    fn test_highest_of_skips_unknown_roles() {
        let roles = GuildRoles::new([role(1, 3), role(2, 7), role(3, 5)]);
        let ids = [RoleId::new(1), RoleId::new(3), RoleId::new(99)];
        assert_eq!(roles.highest_of(&ids).map(|r| r.id), Some(RoleId::new(3)));
        assert!(roles.highest_of(&[RoleId::new(42)]).is_none());
        assert_eq!(roles.len(), 3);
    }
}
