//! Detailed invite report for one member.

use invitetrack_core::{
    CustomInviteRecord, GuildId, InviteCodeRecord, InviteCountBreakdown, InviteResult, MemberId,
};
use invitetrack_storage::InviteStore;
use serde::{Deserialize, Serialize};

use crate::accounting::compute_counts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInviteReport {
    pub guild_id: GuildId,
    pub member_id: MemberId,
    pub counts: InviteCountBreakdown,
    /// Most used first.
    pub invite_codes: Vec<InviteCodeRecord>,
    /// Newest first, at most `history_limit` records.
    pub recent_custom_invites: Vec<CustomInviteRecord>,
    /// Custom invite records left out of `recent_custom_invites`.
    pub omitted_custom_invites: usize,
    pub join_count: u64,
}

/// Gather everything known about a member's invites. Counts are always
/// computed fresh.
pub async fn member_invite_report<S>(
    store: &S,
    guild_id: GuildId,
    member_id: MemberId,
    history_limit: usize,
) -> InviteResult<MemberInviteReport>
where
    S: InviteStore + ?Sized,
{
    let (counts, invite_codes, mut custom_invites, join_count) = tokio::try_join!(
        compute_counts(store, guild_id, member_id),
        store.invite_codes_for(guild_id, member_id),
        store.custom_invites_for(guild_id, member_id),
        store.count_joins(guild_id, member_id),
    )?;

    let omitted_custom_invites = custom_invites.len().saturating_sub(history_limit);
    custom_invites.truncate(history_limit);

    Ok(MemberInviteReport {
        guild_id,
        member_id,
        counts,
        invite_codes,
        recent_custom_invites: custom_invites,
        omitted_custom_invites,
        join_count,
    })
}
