//! Property-Based Tests for Rank Promotion
//!
//! **Property 1: Empty Ranks Are a No-Op**
//!
//! **Property 2: No Mutations Without Manage Roles**
//!
//! **Property 3: Highest Style Keeps One Rank**
//! After applying a `highest` plan, the member holds at most one reached,
//! non-dangerous rank that the bot is able to manage.
//!
//! **Property 4: Hierarchy Is Respected**
//! Nothing at or above the bot's highest role is granted or revoked.

use std::collections::BTreeSet;

use invitetrack_core::{RankAssignmentStyle, RankThreshold, RoleId};
use invitetrack_engine::{evaluate, GuildRoles, PromotionInput};
use invitetrack_test_utils::assertions::assert_no_mutations;
use invitetrack_test_utils::fixtures::role;
use invitetrack_test_utils::generators::{arb_promotion_scenario, MISSING_ROLE};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_empty_ranks_is_noop(mut scenario in arb_promotion_scenario()) {
        scenario.ranks.clear();
        let roles = scenario.roles();
        let plan = evaluate(&scenario.input(&roles));

        assert_no_mutations(&plan);
        prop_assert!(plan.dangerous_roles.is_empty());
        prop_assert!(plan.roles_blocked_by_hierarchy.is_empty());
        prop_assert_eq!(plan.highest, None);
        prop_assert_eq!(plan.announce, None);
    }

    #[test]
    fn prop_no_manage_roles_means_no_mutations(mut scenario in arb_promotion_scenario()) {
        scenario.bot_has_manage_roles = false;
        let roles = scenario.roles();
        let plan = evaluate(&scenario.input(&roles));

        assert_no_mutations(&plan);
        prop_assert!(!plan.manage_roles_available);
    }

    #[test]
    fn prop_highest_style_keeps_one_rank(mut scenario in arb_promotion_scenario()) {
        scenario.style = RankAssignmentStyle::Highest;
        let roles = scenario.roles();
        let plan = evaluate(&scenario.input(&roles));

        let mut held = scenario.member_roles.clone();
        for role_id in plan.roles_to_revoke.keys() {
            held.remove(role_id);
        }
        held.extend(plan.roles_to_grant.iter().copied());

        let bot_position = scenario.bot_position();
        let reached: BTreeSet<RoleId> = scenario
            .ranks
            .iter()
            .filter(|rank| rank.num_invites_required <= scenario.total_invites)
            .map(|rank| rank.role_id)
            .collect();
        let kept = held
            .iter()
            .filter_map(|id| roles.get(*id))
            .filter(|role| reached.contains(&role.id))
            .filter(|role| !role.permissions.is_elevated())
            .filter(|role| role.position < bot_position)
            .count();
        prop_assert!(kept <= 1, "kept {} ranks: {:?}", kept, plan);
    }

    #[test]
    fn prop_hierarchy_is_respected(scenario in arb_promotion_scenario()) {
        let roles = scenario.roles();
        let plan = evaluate(&scenario.input(&roles));
        let bot_position = scenario.bot_position();

        for role_id in plan.roles_to_grant.iter().chain(plan.roles_to_revoke.keys()) {
            let role = roles.get(*role_id);
            prop_assert!(role.is_some());
            prop_assert!(role.map_or(false, |r| r.position < bot_position));
        }
        for role_id in &plan.roles_to_grant {
            prop_assert!(!scenario.member_roles.contains(role_id));
            prop_assert!(!plan.dangerous_roles.contains(role_id));
        }
        for role_id in plan.roles_to_revoke.keys() {
            prop_assert!(scenario.member_roles.contains(role_id));
        }
        prop_assert!(!plan.unresolved_ranks.iter().any(|id| *id != MISSING_ROLE));
    }
}

fn two_rank_plan(total: i64, role_b_position: i32) -> invitetrack_core::RoleChangePlan {
    let roles = GuildRoles::new(vec![role(1, 1), role(2, role_b_position), role(100, 10)]);
    let ranks = vec![
        RankThreshold::new(RoleId::new(1), 5),
        RankThreshold::new(RoleId::new(2), 10),
    ];
    let member_roles = BTreeSet::new();
    let bot_roles = [RoleId::new(100)];
    evaluate(&PromotionInput {
        total_invites: total,
        ranks: &ranks,
        guild_roles: &roles,
        member_roles: &member_roles,
        bot_roles: &bot_roles,
        bot_has_manage_roles: true,
        style: RankAssignmentStyle::All,
    })
}

#[test]
fn test_example_grants_reached_rank() {
    let plan = two_rank_plan(7, 2);
    assert_eq!(plan.roles_to_grant, BTreeSet::from([RoleId::new(1)]));
    assert_eq!(plan.highest, Some(RoleId::new(1)));
    assert!(plan.roles_blocked_by_hierarchy.is_empty());
}

#[test]
fn test_example_reports_blocked_rank() {
    let plan = two_rank_plan(12, 20);
    assert_eq!(plan.roles_to_grant, BTreeSet::from([RoleId::new(1)]));
    assert_eq!(
        plan.roles_blocked_by_hierarchy,
        BTreeSet::from([RoleId::new(2)])
    );
}
