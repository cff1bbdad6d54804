//! Rank promotion evaluation.
//!
//! [`evaluate`] is a pure function of a member's total, the guild's rank
//! configuration and a role snapshot. It never calls a collaborator; the
//! resulting [`RoleChangePlan`] is carried out by [`crate::executor`].
//!
//! Permission problems are data, not errors: a bot without role management
//! gets an empty plan with `manage_roles_available = false`, and roles above
//! the bot's highest role are reported in the `*_blocked_by_hierarchy` sets.

use std::collections::BTreeSet;

use invitetrack_core::{
    GuildRole, RankAssignmentStyle, RankThreshold, RevokeReason, RoleChangePlan, RoleId,
};

use crate::collaborators::GuildRoles;

/// Everything [`evaluate`] looks at.
#[derive(Debug, Clone, Copy)]
pub struct PromotionInput<'a> {
    pub total_invites: i64,
    /// Rank thresholds in configuration order.
    pub ranks: &'a [RankThreshold],
    pub guild_roles: &'a GuildRoles,
    pub member_roles: &'a BTreeSet<RoleId>,
    pub bot_roles: &'a [RoleId],
    pub bot_has_manage_roles: bool,
    pub style: RankAssignmentStyle,
}

/// Decide which rank roles a member should gain and lose.
pub fn evaluate(input: &PromotionInput<'_>) -> RoleChangePlan {
    let mut plan = RoleChangePlan {
        num_ranks: input.ranks.len(),
        manage_roles_available: input.bot_has_manage_roles,
        ..RoleChangePlan::default()
    };
    if input.ranks.is_empty() {
        return plan;
    }

    let mut reached: Vec<&GuildRole> = Vec::new();
    let mut not_reached: Vec<&GuildRole> = Vec::new();
    let mut highest: Option<&GuildRole> = None;
    let mut next: Option<(RankThreshold, &GuildRole)> = None;

    for rank in input.ranks {
        let Some(role) = input.guild_roles.get(rank.role_id) else {
            tracing::warn!(role_id = %rank.role_id, "Rank role no longer exists in guild, skipping");
            plan.unresolved_ranks.push(rank.role_id);
            continue;
        };

        if rank.num_invites_required <= input.total_invites {
            if highest.map_or(true, |h| h.position < role.position) {
                highest = Some(role);
            }
            reached.push(role);
        } else {
            if next.map_or(true, |(n, _)| rank.num_invites_required < n.num_invites_required) {
                next = Some((*rank, role));
            }
            not_reached.push(role);
        }
    }

    // A role configured at two thresholds counts as reached once either is met.
    not_reached.retain(|role| !reached.iter().any(|r| r.id == role.id));

    plan.highest = highest.map(|role| role.id);
    if let Some((rank, role)) = next {
        plan.next_rank = Some(rank);
        plan.next_threshold_role_name = Some(role.name.clone());
    }

    if !input.bot_has_manage_roles {
        tracing::debug!("Bot cannot manage roles, no rank changes planned");
        return plan;
    }

    let bot_position = input
        .guild_roles
        .highest_of(input.bot_roles)
        .map_or(0, |role| role.position);
    let too_high = |role: &GuildRole| role.position >= bot_position;
    let holds = |role: &GuildRole| input.member_roles.contains(&role.id);

    for role in not_reached.iter().copied().filter(|r| holds(*r)) {
        if too_high(role) {
            plan.revocations_blocked_by_hierarchy.insert(role.id);
        } else {
            plan.roles_to_revoke
                .insert(role.id, RevokeReason::InsufficientInvites);
        }
    }

    let mut grantable: Vec<&GuildRole> = Vec::new();
    for role in reached {
        if role.permissions.is_elevated() {
            plan.dangerous_roles.insert(role.id);
        } else if !grantable.iter().any(|r| r.id == role.id) {
            grantable.push(role);
        }
    }

    match input.style {
        RankAssignmentStyle::All => {
            for role in grantable.iter().copied().filter(|r| !holds(*r)) {
                if too_high(role) {
                    plan.roles_blocked_by_hierarchy.insert(role.id);
                } else {
                    plan.roles_to_grant.insert(role.id);
                }
            }
        }
        RankAssignmentStyle::Highest => {
            let mut target: Option<&GuildRole> = None;
            for role in grantable.iter().copied() {
                if target.map_or(true, |t| t.position < role.position) {
                    target = Some(role);
                }
            }

            for role in grantable.iter().copied() {
                if target.map_or(false, |t| t.id == role.id) || !holds(role) {
                    continue;
                }
                if too_high(role) {
                    plan.revocations_blocked_by_hierarchy.insert(role.id);
                } else {
                    plan.roles_to_revoke.insert(role.id, RevokeReason::NotHighestRank);
                }
            }

            if let Some(role) = target.filter(|r| !holds(*r)) {
                if too_high(role) {
                    plan.roles_blocked_by_hierarchy.insert(role.id);
                } else {
                    plan.roles_to_grant.insert(role.id);
                }
            }
        }
    }

    // Announced on reaching the rank, even when the grant itself is blocked.
    plan.announce = plan
        .highest
        .filter(|role_id| !input.member_roles.contains(role_id));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use invitetrack_core::Permissions;

    const BOT_ROLE: u64 = 100;

    fn role(id: u64, position: i32) -> GuildRole {
        GuildRole {
            id: RoleId::new(id),
            name: format!("role-{id}"),
            position,
            permissions: Permissions::SEND_MESSAGES,
        }
    }

    fn guild(extra: Vec<GuildRole>, bot_position: i32) -> GuildRoles {
        let mut roles = extra;
        roles.push(role(BOT_ROLE, bot_position));
        GuildRoles::new(roles)
    }

    fn ranks() -> Vec<RankThreshold> {
        vec![
            RankThreshold::new(RoleId::new(1), 5),
            RankThreshold::new(RoleId::new(2), 10),
        ]
    }

    struct Case {
        total: i64,
        ranks: Vec<RankThreshold>,
        roles: GuildRoles,
        member: BTreeSet<RoleId>,
        manage: bool,
        style: RankAssignmentStyle,
    }

    impl Case {
        fn new(total: i64, roles: GuildRoles) -> Self {
            Self {
                total,
                ranks: ranks(),
                roles,
                member: BTreeSet::new(),
                manage: true,
                style: RankAssignmentStyle::All,
            }
        }

        fn run(&self) -> RoleChangePlan {
            let bot_roles = [RoleId::new(BOT_ROLE)];
            evaluate(&PromotionInput {
                total_invites: self.total,
                ranks: &self.ranks,
                guild_roles: &self.roles,
                member_roles: &self.member,
                bot_roles: &bot_roles,
                bot_has_manage_roles: self.manage,
                style: self.style,
            })
        }
    }

    fn ids(raw: &[u64]) -> BTreeSet<RoleId> {
        raw.iter().map(|id| RoleId::new(*id)).collect()
    }

    #[test]
    fn test_grants_reached_rank_only() {
        let plan = Case::new(7, guild(vec![role(1, 1), role(2, 2)], 10)).run();
        assert_eq!(plan.roles_to_grant, ids(&[1]));
        assert!(plan.roles_to_revoke.is_empty());
        assert_eq!(plan.highest, Some(RoleId::new(1)));
        assert_eq!(plan.next_rank, Some(RankThreshold::new(RoleId::new(2), 10)));
        assert_eq!(plan.next_threshold_role_name.as_deref(), Some("role-2"));
        assert_eq!(plan.announce, Some(RoleId::new(1)));
    }

    #[test]
    fn test_role_above_bot_is_reported_as_blocked() {
        let plan = Case::new(12, guild(vec![role(1, 1), role(2, 20)], 10)).run();
        assert_eq!(plan.roles_to_grant, ids(&[1]));
        assert_eq!(plan.roles_blocked_by_hierarchy, ids(&[2]));
        assert_eq!(plan.highest, Some(RoleId::new(2)));
        assert_eq!(plan.announce, Some(RoleId::new(2)));
    }

    #[test]
    fn test_empty_ranks_is_noop() {
        let mut case = Case::new(50, guild(vec![role(1, 1)], 10));
        case.ranks.clear();
        let plan = case.run();
        assert!(!plan.has_mutations());
        assert_eq!(plan.num_ranks, 0);
        assert_eq!(plan.highest, None);
    }

    #[test]
    fn test_without_manage_roles_plans_nothing() {
        let mut case = Case::new(12, guild(vec![role(1, 1), role(2, 2)], 10));
        case.manage = false;
        case.member = ids(&[1]);
        let plan = case.run();
        assert!(!plan.has_mutations());
        assert!(!plan.manage_roles_available);
        assert_eq!(plan.highest, Some(RoleId::new(2)));
    }

    #[test]
    fn test_lost_rank_is_revoked() {
        let mut case = Case::new(3, guild(vec![role(1, 1), role(2, 2)], 10));
        case.member = ids(&[1]);
        let plan = case.run();
        assert_eq!(
            plan.roles_to_revoke.get(&RoleId::new(1)),
            Some(&RevokeReason::InsufficientInvites)
        );
        assert!(plan.roles_to_grant.is_empty());
    }

    #[test]
    fn test_lost_rank_above_bot_is_blocked_revocation() {
        let mut case = Case::new(3, guild(vec![role(1, 20), role(2, 2)], 10));
        case.member = ids(&[1]);
        let plan = case.run();
        assert!(plan.roles_to_revoke.is_empty());
        assert_eq!(plan.revocations_blocked_by_hierarchy, ids(&[1]));
    }

    #[test]
    fn test_highest_style_swaps_lower_rank() {
        let mut case = Case::new(12, guild(vec![role(1, 1), role(2, 2)], 10));
        case.style = RankAssignmentStyle::Highest;
        case.member = ids(&[1]);
        let plan = case.run();
        assert_eq!(plan.roles_to_grant, ids(&[2]));
        assert_eq!(
            plan.roles_to_revoke.get(&RoleId::new(1)),
            Some(&RevokeReason::NotHighestRank)
        );
    }

    #[test]
    fn test_dangerous_role_is_never_granted() {
        let mut admin = role(2, 2);
        admin.permissions = Permissions::ADMINISTRATOR;
        let mut case = Case::new(12, guild(vec![role(1, 1), admin], 10));
        case.style = RankAssignmentStyle::Highest;
        let plan = case.run();
        assert_eq!(plan.dangerous_roles, ids(&[2]));
        assert_eq!(plan.roles_to_grant, ids(&[1]));
        assert_eq!(plan.highest, Some(RoleId::new(2)));
        assert_eq!(plan.announce, Some(RoleId::new(2)));
    }

    #[test]
    fn test_held_blocked_highest_is_not_announced() {
        let mut case = Case::new(12, guild(vec![role(1, 1), role(2, 20)], 10));
        case.member = ids(&[2]);
        let plan = case.run();
        assert_eq!(plan.highest, Some(RoleId::new(2)));
        assert_eq!(plan.announce, None);
    }

    #[test]
    fn test_without_manage_roles_announces_nothing() {
        let mut case = Case::new(12, guild(vec![role(1, 1), role(2, 2)], 10));
        case.manage = false;
        let plan = case.run();
        assert_eq!(plan.highest, Some(RoleId::new(2)));
        assert_eq!(plan.announce, None);
    }

    #[test]
    fn test_missing_rank_role_is_skipped() {
        let mut case = Case::new(12, guild(vec![role(1, 1)], 10));
        case.ranks.push(RankThreshold::new(RoleId::new(9), 1));
        let plan = case.run();
        assert_eq!(plan.unresolved_ranks, vec![RoleId::new(2), RoleId::new(9)]);
        assert_eq!(plan.roles_to_grant, ids(&[1]));
        assert_eq!(plan.num_ranks, 3);
    }

    #[test]
    fn test_bot_without_roles_cannot_manage_any_rank() {
        let roles = GuildRoles::new(vec![role(1, 1)]);
        let ranks = ranks();
        let member = BTreeSet::new();
        let plan = evaluate(&PromotionInput {
            total_invites: 7,
            ranks: &ranks,
            guild_roles: &roles,
            member_roles: &member,
            bot_roles: &[],
            bot_has_manage_roles: true,
            style: RankAssignmentStyle::All,
        });
        assert!(plan.roles_to_grant.is_empty());
        assert_eq!(plan.roles_blocked_by_hierarchy, ids(&[1]));
    }

    #[test]
    fn test_already_held_rank_is_not_announced() {
        let mut case = Case::new(7, guild(vec![role(1, 1), role(2, 2)], 10));
        case.member = ids(&[1]);
        let plan = case.run();
        assert!(!plan.has_mutations());
        assert_eq!(plan.announce, None);
    }
}
