//! Property-Based Tests for Invite Accounting and Leaderboards
//!
//! **Property 1: Breakdown Consistency**
//! For any rows, `total == regular + custom + fake + leave` with
//! `fake <= 0`, `leave <= 0` and `regular >= 0`.
//!
//! **Property 2: Leaderboard Ranking**
//! Output holds only positive totals, ordered by total descending and then
//! by name ascending.
//!
//! **Property 3: Merge Commutativity**
//! Merging the three sources in any order yields the same map.

use invitetrack_core::{JoinInvalidatedReason, MemberId};
use invitetrack_engine::{
    compute_counts, fold_counts, leaderboard_from_rows, merge_contributions, tag_sources,
};
use invitetrack_test_utils::assertions::{assert_consistent, assert_ranked};
use invitetrack_test_utils::fixtures::{self, ALICE, BOB, GUILD};
use invitetrack_test_utils::generators::arb_leaderboard_sources;
use proptest::prelude::*;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_breakdown_is_consistent((regular, invalidated, custom) in arb_leaderboard_sources()) {
        let member = MemberId::new(1);
        let regular: Vec<_> = regular.into_iter().filter(|r| r.inviter_id == member).collect();
        let invalidated: Vec<_> = invalidated.into_iter().filter(|r| r.inviter_id == member).collect();
        let custom: Vec<_> = custom.into_iter().filter(|r| r.member_id == member).collect();

        let counts = fold_counts(&regular, &invalidated, &custom);
        assert_consistent(&counts);

        let fakes: i64 = invalidated
            .iter()
            .filter(|r| r.reason == JoinInvalidatedReason::Fake)
            .map(|r| r.total)
            .sum();
        prop_assert_eq!(counts.fake, -fakes);
    }

    #[test]
    fn prop_leaderboard_is_ranked((regular, invalidated, custom) in arb_leaderboard_sources()) {
        let entries = leaderboard_from_rows(regular, invalidated, custom);
        assert_ranked(&entries);
        for entry in &entries {
            prop_assert!(entry.breakdown().is_consistent());
            prop_assert_eq!(entry.total, entry.regular + entry.custom + entry.fakes + entry.leaves);
        }
    }

    #[test]
    fn prop_merge_is_order_independent(
        (regular, invalidated, custom) in arb_leaderboard_sources(),
        rotate in 0usize..30,
    ) {
        let forward = tag_sources(regular.clone(), invalidated.clone(), custom.clone());
        let mut shuffled = forward.clone();
        shuffled.reverse();
        if !shuffled.is_empty() {
            let by = rotate % shuffled.len();
            shuffled.rotate_left(by);
        }

        prop_assert_eq!(merge_contributions(forward), merge_contributions(shuffled));
    }
}

#[test]
fn test_example_breakdown() {
    let store = fixtures::seeded_store();
    let rt = Runtime::new().expect("runtime");
    let counts = rt
        .block_on(compute_counts(&store, GUILD, ALICE))
        .expect("counts");

    assert_eq!(
        (counts.regular, counts.custom, counts.fake, counts.leave, counts.total),
        (5, 2, -1, 0, 6)
    );
}

#[test]
fn test_member_with_no_rows_has_zero_credit() {
    let store = fixtures::seeded_store();
    let rt = Runtime::new().expect("runtime");
    let counts = rt
        .block_on(compute_counts(&store, GUILD, BOB))
        .expect("counts");
    assert_eq!(counts.total, 0);
}

#[test]
fn test_store_failure_is_not_partially_returned() {
    let store = fixtures::seeded_store();
    store.set_failing(true);
    let rt = Runtime::new().expect("runtime");
    assert!(rt.block_on(compute_counts(&store, GUILD, ALICE)).is_err());
    assert!(rt
        .block_on(invitetrack_engine::build_leaderboard(&store, GUILD))
        .is_err());
}
