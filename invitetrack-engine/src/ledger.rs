//! The engine facade.
//!
//! [`InviteLedger`] owns the store handle, the guild caches and the
//! collaborators, and is the only place that mutates the store and then
//! invalidates the caches that depend on it.

use std::sync::Arc;

use invitetrack_core::{
    ChannelId, EngineConfig, GuildId, GuildSettingUpdate, GuildSettings,
    InviteCountBreakdown, InviteResult, LeaderboardEntry, MemberId, MessageId, RankThreshold,
    RoleChangePlan, RoleId,
};
use invitetrack_storage::{InviteStore, MemberKey, SettingsStore};

use crate::caches::GuildCaches;
use crate::collaborators::{GuildRoleProvider, MemberSnapshot, Messenger, RoleMutator};
use crate::executor::{apply_plan, MutationOutcome};
use crate::leaderboard::build_leaderboard;
use crate::promotion::{evaluate, PromotionInput};
use crate::report::{member_invite_report, MemberInviteReport};
use crate::restore::{clear_invites, restore_invites, CreditChangeSummary};
use crate::template::TemplateVars;

/// What happened to a rank announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementOutcome {
    /// The plan did not ask for one.
    NotRequested,
    NoChannelConfigured,
    NoMessageConfigured,
    /// The configured channel is gone; the setting was cleared.
    ChannelCleared { channel_id: ChannelId },
    Sent {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    /// Checking, rendering or sending failed. Role changes still ran.
    Failed { reason: String },
}

/// Everything a promotion check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionOutcome {
    pub plan: RoleChangePlan,
    pub mutations: Vec<MutationOutcome>,
    pub announcement: AnnouncementOutcome,
}

impl PromotionOutcome {
    fn noop() -> Self {
        Self {
            plan: RoleChangePlan::default(),
            mutations: Vec::new(),
            announcement: AnnouncementOutcome::NotRequested,
        }
    }

    /// Mutations that did not go through.
    pub fn failed_mutations(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.mutations.iter().filter(|outcome| !outcome.succeeded())
    }
}

/// Invite accounting, leaderboards and rank promotion over one store.
pub struct InviteLedger<S> {
    store: Arc<S>,
    caches: GuildCaches,
    roles: Arc<dyn GuildRoleProvider>,
    mutator: Arc<dyn RoleMutator>,
    messenger: Arc<dyn Messenger>,
    config: EngineConfig,
}

impl<S> InviteLedger<S>
where
    S: InviteStore + SettingsStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        roles: Arc<dyn GuildRoleProvider>,
        mutator: Arc<dyn RoleMutator>,
        messenger: Arc<dyn Messenger>,
        config: EngineConfig,
    ) -> Self {
        let caches = GuildCaches::new(store.clone(), &config);
        Self {
            store,
            caches,
            roles,
            mutator,
            messenger,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn caches(&self) -> &GuildCaches {
        &self.caches
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // ACCOUNTING
    // ========================================================================

    /// A member's invite breakdown, from cache when present.
    pub async fn invite_counts(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<InviteCountBreakdown> {
        self.caches.counts.get(&MemberKey::new(guild_id, member_id)).await
    }

    /// A member's invite breakdown, recomputed and re-cached.
    pub async fn fresh_invite_counts(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<InviteCountBreakdown> {
        let key = MemberKey::new(guild_id, member_id);
        self.caches.invalidate_member(&key);
        self.caches.counts.get(&key).await
    }

    /// The guild leaderboard. Always built from the store.
    pub async fn leaderboard(&self, guild_id: GuildId) -> InviteResult<Vec<LeaderboardEntry>> {
        build_leaderboard(self.store.as_ref(), guild_id).await
    }

    pub async fn member_report(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<MemberInviteReport> {
        member_invite_report(
            self.store.as_ref(),
            guild_id,
            member_id,
            self.config.custom_invite_history,
        )
        .await
    }

    /// Drop cached counts after an external write to one member's records.
    pub fn invalidate_member(&self, guild_id: GuildId, member_id: MemberId) -> bool {
        self.caches.invalidate_member(&MemberKey::new(guild_id, member_id))
    }

    /// Drop every cached count for a guild.
    pub fn invalidate_guild(&self, guild_id: GuildId) -> u64 {
        self.caches.invalidate_guild_counts(guild_id)
    }

    // ========================================================================
    // CLEAR / RESTORE
    // ========================================================================

    /// Clear one member's credit, or the whole guild's with `None`.
    pub async fn clear_invites(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<CreditChangeSummary> {
        let result = clear_invites(self.store.as_ref(), guild_id, member_id).await;
        self.invalidate_after_write(guild_id, member_id);
        result
    }

    /// Restore previously cleared credit.
    pub async fn restore_invites(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<CreditChangeSummary> {
        let result = restore_invites(self.store.as_ref(), guild_id, member_id).await;
        self.invalidate_after_write(guild_id, member_id);
        result
    }

    // Runs on failure too: a partial write still changed the store.
    fn invalidate_after_write(&self, guild_id: GuildId, member_id: Option<MemberId>) {
        match member_id {
            Some(member_id) => {
                self.invalidate_member(guild_id, member_id);
            }
            None => {
                self.invalidate_guild(guild_id);
            }
        }
    }

    // ========================================================================
    // SETTINGS
    // ========================================================================

    pub async fn ranks(&self, guild_id: GuildId) -> InviteResult<Arc<[RankThreshold]>> {
        self.caches.ranks.get(&guild_id).await
    }

    /// Drop cached ranks after the rank configuration changed.
    pub fn invalidate_ranks(&self, guild_id: GuildId) -> bool {
        self.caches.ranks.invalidate(&guild_id)
    }

    pub async fn settings(&self, guild_id: GuildId) -> InviteResult<GuildSettings> {
        self.caches.settings.get(&guild_id).await
    }

    pub async fn set_setting(
        &self,
        guild_id: GuildId,
        update: &GuildSettingUpdate,
    ) -> InviteResult<GuildSettings> {
        self.caches
            .settings_set_one(self.store.as_ref(), guild_id, update)
            .await
    }

    pub async fn is_premium(&self, guild_id: GuildId) -> InviteResult<bool> {
        self.caches.premium.get(&guild_id).await
    }

    // ========================================================================
    // PROMOTION
    // ========================================================================

    /// Recompute a member's counts and promote on the fresh total.
    pub async fn recheck_member(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<PromotionOutcome> {
        let counts = self.fresh_invite_counts(guild_id, member_id).await?;
        self.promote_if_qualified(guild_id, member_id, counts.total).await
    }

    /// Bring a member's rank roles in line with `total_invites`.
    ///
    /// Store and role provider failures are returned as errors. Announcement
    /// and role mutation failures are logged and reported in the outcome.
    pub async fn promote_if_qualified(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        total_invites: i64,
    ) -> InviteResult<PromotionOutcome> {
        let ranks = self.ranks(guild_id).await?;
        if ranks.is_empty() {
            return Ok(PromotionOutcome::noop());
        }

        let (guild_roles, member, bot) = tokio::try_join!(
            self.roles.guild_roles(guild_id),
            self.roles.member(guild_id, member_id),
            self.roles.bot_member(guild_id),
        )?;
        let settings = self.settings(guild_id).await?;

        let plan = evaluate(&PromotionInput {
            total_invites,
            ranks: &ranks,
            guild_roles: &guild_roles,
            member_roles: &member.role_ids,
            bot_roles: &bot.role_ids,
            bot_has_manage_roles: bot.has_manage_roles,
            style: settings.rank_assignment_style,
        });
        tracing::debug!(
            %guild_id,
            %member_id,
            total_invites,
            grants = plan.roles_to_grant.len(),
            revokes = plan.roles_to_revoke.len(),
            blocked = plan.roles_blocked_by_hierarchy.len(),
            dangerous = plan.dangerous_roles.len(),
            "Evaluated rank promotion"
        );

        let announcement = match plan.announce {
            Some(role_id) => {
                let rank_name = guild_roles
                    .get(role_id)
                    .map(|role| role.name.clone())
                    .unwrap_or_default();
                match self
                    .announce(guild_id, &settings, &member, role_id, &rank_name, total_invites)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(%guild_id, %member_id, error = %e, "Rank announcement failed");
                        AnnouncementOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            }
            None => AnnouncementOutcome::NotRequested,
        };

        let mutations = apply_plan(self.mutator.as_ref(), guild_id, member_id, &plan).await;

        Ok(PromotionOutcome {
            plan,
            mutations,
            announcement,
        })
    }

    async fn announce(
        &self,
        guild_id: GuildId,
        settings: &GuildSettings,
        member: &MemberSnapshot,
        role_id: RoleId,
        rank_name: &str,
        total_invites: i64,
    ) -> InviteResult<AnnouncementOutcome> {
        let Some(channel_id) = settings.rank_announcement_channel else {
            return Ok(AnnouncementOutcome::NoChannelConfigured);
        };

        if !self.messenger.channel_exists(guild_id, channel_id).await? {
            tracing::warn!(
                %guild_id,
                %channel_id,
                "Rank announcement channel no longer exists, clearing setting"
            );
            self.set_setting(guild_id, &GuildSettingUpdate::RankAnnouncementChannel(None))
                .await?;
            return Ok(AnnouncementOutcome::ChannelCleared { channel_id });
        }

        let Some(template) = settings.rank_announcement_message.as_deref() else {
            return Ok(AnnouncementOutcome::NoMessageConfigured);
        };

        let vars = announcement_vars(member, role_id, rank_name, total_invites);
        let message = self.messenger.render(guild_id, template, &vars).await?;

        let message_id = self.messenger.send(channel_id, &message).await?;

        if let Err(error) = self
            .messenger
            .add_reaction(channel_id, message_id, &self.config.announcement_reaction)
            .await
        {
            tracing::debug!(%guild_id, %channel_id, %error, "Adding announcement reaction failed");
        }

        Ok(AnnouncementOutcome::Sent {
            channel_id,
            message_id,
        })
    }
}

impl<S> std::fmt::Debug for InviteLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteLedger")
            .field("caches", &self.caches)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Template values for a rank announcement.
pub fn announcement_vars(
    member: &MemberSnapshot,
    role_id: RoleId,
    rank_name: &str,
    total_invites: i64,
) -> TemplateVars {
    TemplateVars::new()
        .with("memberId", member.id.to_string())
        .with("memberName", member.display.name.clone().unwrap_or_default())
        .with("memberFullName", member.display.full_name())
        .with("memberMention", member.id.mention())
        .with("memberImage", member.avatar_url.clone().unwrap_or_default())
        .with("rankMention", role_id.mention())
        .with("rankName", rank_name)
        .with("totalInvites", total_invites.to_string())
}
