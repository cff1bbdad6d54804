//! Clearing and restoring invite credit.
//!
//! These functions only touch the store. Cache invalidation is the caller's
//! job; [`crate::InviteLedger`] does it for every path through here.

use invitetrack_core::{GuildId, InviteResult, MemberId};
use invitetrack_storage::{InviteStore, JoinSelector};
use serde::{Deserialize, Serialize};

/// Rows touched by a clear or restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditChangeSummary {
    pub invite_codes: u64,
    pub joins: u64,
    pub custom_invites: u64,
}

impl CreditChangeSummary {
    pub fn total(&self) -> u64 {
        self.invite_codes + self.joins + self.custom_invites
    }
}

/// Which joins follow a member's (or the whole guild's) invite codes.
///
/// `None` means the member has no invite codes, so no join can be theirs.
async fn join_selector<S>(
    store: &S,
    guild_id: GuildId,
    member_id: Option<MemberId>,
) -> InviteResult<Option<JoinSelector>>
where
    S: InviteStore + ?Sized,
{
    let Some(member_id) = member_id else {
        return Ok(Some(JoinSelector::AllInGuild));
    };

    let codes: Vec<String> = store
        .invite_codes_for(guild_id, member_id)
        .await?
        .into_iter()
        .map(|code| code.code)
        .collect();
    if codes.is_empty() {
        return Ok(None);
    }
    Ok(Some(JoinSelector::ExactMatchCodes(codes)))
}

async fn set_cleared<S>(
    store: &S,
    guild_id: GuildId,
    member_id: Option<MemberId>,
    cleared: bool,
) -> InviteResult<CreditChangeSummary>
where
    S: InviteStore + ?Sized,
{
    // Resolve codes first: the selector does not depend on cleared amounts.
    let selector = join_selector(store, guild_id, member_id).await?;

    let invite_codes = if cleared {
        store.clear_invite_codes(guild_id, member_id).await?
    } else {
        store.restore_invite_codes(guild_id, member_id).await?
    };
    let joins = match &selector {
        Some(selector) => store.mark_joins_cleared(guild_id, selector, cleared).await?,
        None => 0,
    };
    let custom_invites = store
        .mark_custom_invites_cleared(guild_id, member_id, cleared)
        .await?;

    Ok(CreditChangeSummary {
        invite_codes,
        joins,
        custom_invites,
    })
}

/// Zero out credit: mark codes fully cleared, and joins and custom invites
/// as cleared. `None` clears the whole guild.
pub async fn clear_invites<S>(
    store: &S,
    guild_id: GuildId,
    member_id: Option<MemberId>,
) -> InviteResult<CreditChangeSummary>
where
    S: InviteStore + ?Sized,
{
    let summary = set_cleared(store, guild_id, member_id, true).await?;
    tracing::info!(
        %guild_id,
        member_id = ?member_id,
        invite_codes = summary.invite_codes,
        joins = summary.joins,
        custom_invites = summary.custom_invites,
        "Cleared invites"
    );
    Ok(summary)
}

/// Undo a previous clear. `None` restores the whole guild.
pub async fn restore_invites<S>(
    store: &S,
    guild_id: GuildId,
    member_id: Option<MemberId>,
) -> InviteResult<CreditChangeSummary>
where
    S: InviteStore + ?Sized,
{
    let summary = set_cleared(store, guild_id, member_id, false).await?;
    tracing::info!(
        %guild_id,
        member_id = ?member_id,
        invite_codes = summary.invite_codes,
        joins = summary.joins,
        custom_invites = summary.custom_invites,
        "Restored invites"
    );
    Ok(summary)
}
