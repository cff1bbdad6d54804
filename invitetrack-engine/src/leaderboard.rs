//! Guild leaderboard.
//!
//! The three aggregate sources are tagged as [`SourceContribution`]s and
//! merged into one entry per member. Merging is order independent: the
//! numbers are sums, and a member's display name is taken from whichever
//! source first supplies one (all sources read it from the same member row).

use std::cmp::Ordering;
use std::collections::HashMap;

use invitetrack_core::{
    CustomAdjustmentRow, GuildId, InvalidatedJoinRow, InviteResult, JoinInvalidatedReason,
    LeaderboardEntry, MemberDisplay, MemberId, RegularCreditRow,
};
use invitetrack_storage::InviteStore;

/// One aggregate row, tagged by the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceContribution {
    Regular(RegularCreditRow),
    InvalidatedJoin(InvalidatedJoinRow),
    Custom(CustomAdjustmentRow),
}

impl SourceContribution {
    pub fn member_id(&self) -> MemberId {
        match self {
            SourceContribution::Regular(row) => row.inviter_id,
            SourceContribution::InvalidatedJoin(row) => row.inviter_id,
            SourceContribution::Custom(row) => row.member_id,
        }
    }

    pub fn display(&self) -> &MemberDisplay {
        match self {
            SourceContribution::Regular(row) => &row.display,
            SourceContribution::InvalidatedJoin(row) => &row.display,
            SourceContribution::Custom(row) => &row.display,
        }
    }

    fn apply(&self, entry: &mut LeaderboardEntry) {
        if entry.name.is_none() {
            if let Some(name) = &self.display().name {
                entry.name = Some(name.clone());
                entry.discriminator = self.display().discriminator.clone();
            }
        }

        match self {
            SourceContribution::Regular(row) => {
                entry.regular += row.total;
                entry.total += row.total;
            }
            SourceContribution::InvalidatedJoin(row) => {
                match row.reason {
                    JoinInvalidatedReason::Fake => entry.fakes -= row.total,
                    JoinInvalidatedReason::Leave => entry.leaves -= row.total,
                }
                entry.total -= row.total;
            }
            SourceContribution::Custom(row) => {
                entry.custom += row.total;
                entry.total += row.total;
            }
        }
    }
}

/// Tag the rows of each source.
pub fn tag_sources(
    regular: Vec<RegularCreditRow>,
    invalidated: Vec<InvalidatedJoinRow>,
    custom: Vec<CustomAdjustmentRow>,
) -> Vec<SourceContribution> {
    regular
        .into_iter()
        .map(SourceContribution::Regular)
        .chain(invalidated.into_iter().map(SourceContribution::InvalidatedJoin))
        .chain(custom.into_iter().map(SourceContribution::Custom))
        .collect()
}

/// Merge contributions into one unranked entry per member.
pub fn merge_contributions<I>(contributions: I) -> HashMap<MemberId, LeaderboardEntry>
where
    I: IntoIterator<Item = SourceContribution>,
{
    let mut entries: HashMap<MemberId, LeaderboardEntry> = HashMap::new();
    for contribution in contributions {
        let entry = entries
            .entry(contribution.member_id())
            .or_insert_with(|| LeaderboardEntry::empty(contribution.member_id(), &MemberDisplay::default()));
        contribution.apply(entry);
    }
    entries
}

/// Drop members without positive credit and sort the rest: total
/// descending, then name ascending with unnamed members last.
pub fn rank_entries(entries: HashMap<MemberId, LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<LeaderboardEntry> = entries
        .into_values()
        .filter(|entry| entry.total > 0)
        .collect();
    ranked.sort_by(compare_entries);
    ranked
}

fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.total
        .cmp(&a.total)
        .then_with(|| match (&a.name, &b.name) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.member_id.cmp(&b.member_id))
}

/// Build a ranked leaderboard from already fetched rows.
pub fn leaderboard_from_rows(
    regular: Vec<RegularCreditRow>,
    invalidated: Vec<InvalidatedJoinRow>,
    custom: Vec<CustomAdjustmentRow>,
) -> Vec<LeaderboardEntry> {
    rank_entries(merge_contributions(tag_sources(regular, invalidated, custom)))
}

/// Query the store and build the guild's leaderboard.
pub async fn build_leaderboard<S>(store: &S, guild_id: GuildId) -> InviteResult<Vec<LeaderboardEntry>>
where
    S: InviteStore + ?Sized,
{
    let (regular, invalidated, custom) = tokio::try_join!(
        store.query_regular_credit(guild_id, None),
        store.query_invalidated_joins(guild_id, None),
        store.query_custom_adjustments(guild_id, None),
    )?;

    let entries = leaderboard_from_rows(regular, invalidated, custom);
    tracing::debug!(%guild_id, entries = entries.len(), "Built leaderboard");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(member: u64, name: &str, total: i64) -> RegularCreditRow {
        RegularCreditRow {
            inviter_id: MemberId::new(member),
            display: MemberDisplay::new(name, "0001"),
            total,
        }
    }

    fn invalidated(member: u64, name: &str, reason: JoinInvalidatedReason, total: i64) -> InvalidatedJoinRow {
        InvalidatedJoinRow {
            inviter_id: MemberId::new(member),
            display: MemberDisplay::new(name, "0001"),
            reason,
            total,
        }
    }

    fn custom(member: u64, name: &str, total: i64) -> CustomAdjustmentRow {
        CustomAdjustmentRow {
            member_id: MemberId::new(member),
            display: MemberDisplay::new(name, "0001"),
            total,
        }
    }

    #[test]
    fn test_single_member_breakdown() {
        let entries = leaderboard_from_rows(
            vec![regular(1, "A", 4)],
            vec![invalidated(1, "A", JoinInvalidatedReason::Fake, 1)],
            vec![custom(1, "A", 2)],
        );
        assert_eq!(entries.len(), 1);
        let a = &entries[0];
        assert_eq!((a.total, a.regular, a.custom, a.fakes, a.leaves), (5, 4, 2, -1, 0));
        assert_eq!(a.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_non_positive_totals_are_excluded() {
        let entries = leaderboard_from_rows(
            vec![regular(1, "A", 4), regular(2, "B", 1)],
            vec![invalidated(2, "B", JoinInvalidatedReason::Leave, 3)],
            vec![],
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].member_id, MemberId::new(1));
    }

    #[test]
    fn test_ties_sort_by_name_then_unnamed_last() {
        let mut unnamed = regular(3, "x", 2);
        unnamed.display = MemberDisplay::default();
        let entries = leaderboard_from_rows(
            vec![regular(1, "b", 2), unnamed, regular(2, "a", 2), regular(4, "z", 9)],
            vec![],
            vec![],
        );
        let order: Vec<u64> = entries.iter().map(|e| e.member_id.get()).collect();
        assert_eq!(order, vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_custom_only_member_appears() {
        let entries = leaderboard_from_rows(vec![], vec![], vec![custom(7, "C", 3)]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].custom, 3);
        assert_eq!(entries[0].regular, 0);
    }

    #[test]
    fn test_name_comes_from_first_source_with_one() {
        let mut nameless = regular(1, "x", 2);
        nameless.display = MemberDisplay::default();
        let merged = merge_contributions(vec![
            SourceContribution::Regular(nameless),
            SourceContribution::Custom(custom(1, "Named", 1)),
        ]);
        assert_eq!(merged[&MemberId::new(1)].name.as_deref(), Some("Named"));
    }
}
