//! Per-member invite accounting.
//!
//! A member's credit comes from three independent store aggregates that are
//! queried concurrently and folded into one [`InviteCountBreakdown`].

use invitetrack_core::{
    CustomAdjustmentRow, GuildId, InvalidatedJoinRow, InviteCountBreakdown, InviteResult,
    JoinInvalidatedReason, MemberId, RegularCreditRow,
};
use invitetrack_storage::InviteStore;

/// Compute a member's invite breakdown straight from the store.
///
/// Callers that can tolerate cached values should go through
/// [`crate::GuildCaches::counts`] instead.
pub async fn compute_counts<S>(
    store: &S,
    guild_id: GuildId,
    member_id: MemberId,
) -> InviteResult<InviteCountBreakdown>
where
    S: InviteStore + ?Sized,
{
    let (regular, invalidated, custom) = tokio::try_join!(
        store.query_regular_credit(guild_id, Some(member_id)),
        store.query_invalidated_joins(guild_id, Some(member_id)),
        store.query_custom_adjustments(guild_id, Some(member_id)),
    )?;

    let counts = fold_counts(&regular, &invalidated, &custom);
    tracing::trace!(%guild_id, %member_id, total = counts.total, "Computed invite counts");
    Ok(counts)
}

/// Fold aggregate rows into a breakdown. Rows are assumed to belong to one
/// member already.
pub fn fold_counts(
    regular: &[RegularCreditRow],
    invalidated: &[InvalidatedJoinRow],
    custom: &[CustomAdjustmentRow],
) -> InviteCountBreakdown {
    let regular_total: i64 = regular.iter().map(|row| row.total).sum();
    let custom_total: i64 = custom.iter().map(|row| row.total).sum();

    let mut fake = 0;
    let mut leave = 0;
    for row in invalidated {
        match row.reason {
            JoinInvalidatedReason::Fake => fake -= row.total,
            JoinInvalidatedReason::Leave => leave -= row.total,
        }
    }

    InviteCountBreakdown::from_parts(regular_total, custom_total, fake, leave)
}
