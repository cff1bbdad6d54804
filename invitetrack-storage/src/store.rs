//! Async store traits.
//!
//! The store owns every persistent record: invite codes, joins, custom
//! invites, rank configuration, guild settings and premium subscriptions.
//! Query methods return already-aggregated rows so callers never need a
//! second lookup for display names.

use async_trait::async_trait;
use invitetrack_core::{
    CustomAdjustmentRow, CustomInviteRecord, GuildId, GuildSettingUpdate, GuildSettings,
    InvalidatedJoinRow, InviteCodeRecord, InviteResult, MemberId, RankThreshold,
    RegularCreditRow, Timestamp,
};

/// Which joins a cleared-flag update touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinSelector {
    /// Every join in the guild.
    AllInGuild,
    /// Joins whose exact-match invite code is one of these.
    ExactMatchCodes(Vec<String>),
}

/// Invite accounting queries and the mutations that clear or restore credit.
///
/// Every query is guild-scoped. Passing `Some(member)` narrows the result to
/// that member (as inviter for codes and joins, as owner for custom invites).
#[async_trait]
pub trait InviteStore: Send + Sync {
    // ========================================================================
    // AGGREGATE QUERIES
    // ========================================================================

    /// Sum of `uses - cleared_amount` per inviter, over codes where
    /// `uses > cleared_amount`.
    async fn query_regular_credit(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<Vec<RegularCreditRow>>;

    /// Count of uncleared invalidated joins per inviter and reason, linked
    /// through the join's exact-match invite code.
    async fn query_invalidated_joins(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<Vec<InvalidatedJoinRow>>;

    /// Sum of uncleared custom invite amounts per member.
    async fn query_custom_adjustments(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<Vec<CustomAdjustmentRow>>;

    // ========================================================================
    // RECORD LISTINGS
    // ========================================================================

    /// A member's invite codes, most used first.
    async fn invite_codes_for(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<Vec<InviteCodeRecord>>;

    /// A member's custom invite records, newest first.
    async fn custom_invites_for(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<Vec<CustomInviteRecord>>;

    /// How many times a member has joined the guild.
    async fn count_joins(&self, guild_id: GuildId, member_id: MemberId) -> InviteResult<u64>;

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Set `cleared_amount = uses` on matching codes. `None` matches every
    /// code that has an inviter. Returns the number of rows touched.
    async fn clear_invite_codes(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<u64>;

    /// Set `cleared_amount = 0` on matching codes. `None` matches every code
    /// that has an inviter.
    async fn restore_invite_codes(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<u64>;

    /// Set the cleared flag on the selected joins.
    async fn mark_joins_cleared(
        &self,
        guild_id: GuildId,
        selector: &JoinSelector,
        cleared: bool,
    ) -> InviteResult<u64>;

    /// Set the cleared flag on custom invites, optionally only one member's.
    async fn mark_custom_invites_cleared(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
        cleared: bool,
    ) -> InviteResult<u64>;
}

/// Per-guild configuration owned outside the accounting core.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Configured rank thresholds, in configuration order.
    async fn ranks(&self, guild_id: GuildId) -> InviteResult<Vec<RankThreshold>>;

    /// Settings for a guild; defaults when the guild has none stored.
    async fn guild_settings(&self, guild_id: GuildId) -> InviteResult<GuildSettings>;

    /// Write a single setting and return the settings after the write.
    async fn update_guild_setting(
        &self,
        guild_id: GuildId,
        update: &GuildSettingUpdate,
    ) -> InviteResult<GuildSettings>;

    /// Whether a premium subscription for the guild is valid at `now`.
    async fn has_active_premium(&self, guild_id: GuildId, now: Timestamp) -> InviteResult<bool>;
}
