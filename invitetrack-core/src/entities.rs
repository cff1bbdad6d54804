//! Entity types: stored records, aggregate rows and computed results.

use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// STORED RECORDS
// ============================================================================

/// Display metadata for a member, as last seen by the bot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberDisplay {
    pub name: Option<String>,
    pub discriminator: Option<String>,
}

impl MemberDisplay {
    pub fn new(name: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            discriminator: Some(discriminator.into()),
        }
    }

    /// `name#discriminator`, or whatever part is known.
    pub fn full_name(&self) -> String {
        match (&self.name, &self.discriminator) {
            (Some(name), Some(disc)) => format!("{}#{}", name, disc),
            (Some(name), None) => name.clone(),
            (None, _) => String::new(),
        }
    }
}

/// A member known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: MemberId,
    pub display: MemberDisplay,
}

/// A tracked invite code and how often it has been used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCodeRecord {
    pub guild_id: GuildId,
    pub code: String,
    /// Codes created by integrations or vanity urls have no inviter.
    pub inviter_id: Option<MemberId>,
    pub uses: i64,
    /// Uses that were cleared by a moderator and no longer count.
    pub cleared_amount: i64,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

impl InviteCodeRecord {
    /// Uses that still count as regular credit. Never negative.
    pub fn credited_uses(&self) -> i64 {
        (self.uses - self.cleared_amount).max(0)
    }
}

/// A member joining a guild, linked to the invite code that matched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRecord {
    pub id: RecordId,
    pub guild_id: GuildId,
    pub member_id: MemberId,
    pub exact_match_code: Option<String>,
    pub invalidated_reason: Option<JoinInvalidatedReason>,
    pub cleared: bool,
    pub created_at: Timestamp,
}

/// A manual credit or debit recorded for a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomInviteRecord {
    pub id: RecordId,
    pub guild_id: GuildId,
    pub member_id: MemberId,
    /// `None` when the bot itself wrote the record.
    pub creator_id: Option<MemberId>,
    pub amount: i64,
    pub reason: Option<String>,
    pub generated_reason: Option<CustomInviteGeneratedReason>,
    pub cleared: bool,
    pub created_at: Timestamp,
}

/// A premium subscription attached to a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumSubscription {
    pub guild_id: GuildId,
    pub valid_until: Timestamp,
}

// ============================================================================
// AGGREGATE ROWS
// ============================================================================

/// Regular credit summed per inviter over codes with `uses > cleared_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularCreditRow {
    pub inviter_id: MemberId,
    pub display: MemberDisplay,
    pub total: i64,
}

/// Uncleared invalidated joins counted per inviter and reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidatedJoinRow {
    pub inviter_id: MemberId,
    pub display: MemberDisplay,
    pub reason: JoinInvalidatedReason,
    pub total: i64,
}

/// Uncleared custom invite amounts summed per member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAdjustmentRow {
    pub member_id: MemberId,
    pub display: MemberDisplay,
    pub total: i64,
}

// ============================================================================
// COMPUTED RESULTS
// ============================================================================

/// A member's credited invites, split by source.
///
/// `fake` and `leave` are debits and therefore never positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InviteCountBreakdown {
    pub regular: i64,
    pub custom: i64,
    pub fake: i64,
    pub leave: i64,
    pub total: i64,
}

impl InviteCountBreakdown {
    /// Build a breakdown, deriving `total` from the parts.
    pub fn from_parts(regular: i64, custom: i64, fake: i64, leave: i64) -> Self {
        Self {
            regular,
            custom,
            fake,
            leave,
            total: regular + custom + fake + leave,
        }
    }

    /// Whether the sign and sum invariants hold.
    pub fn is_consistent(&self) -> bool {
        self.total == self.regular + self.custom + self.fake + self.leave
            && self.regular >= 0
            && self.fake <= 0
            && self.leave <= 0
    }
}

/// One ranked row of a guild leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub member_id: MemberId,
    pub name: Option<String>,
    pub discriminator: Option<String>,
    pub total: i64,
    pub regular: i64,
    pub custom: i64,
    pub fakes: i64,
    pub leaves: i64,
}

impl LeaderboardEntry {
    /// An entry with no credit yet.
    pub fn empty(member_id: MemberId, display: &MemberDisplay) -> Self {
        Self {
            member_id,
            name: display.name.clone(),
            discriminator: display.discriminator.clone(),
            total: 0,
            regular: 0,
            custom: 0,
            fakes: 0,
            leaves: 0,
        }
    }

    /// The same numbers as an [`InviteCountBreakdown`].
    pub fn breakdown(&self) -> InviteCountBreakdown {
        InviteCountBreakdown {
            regular: self.regular,
            custom: self.custom,
            fake: self.fakes,
            leave: self.leaves,
            total: self.total,
        }
    }
}

// ============================================================================
// GUILD CONFIGURATION
// ============================================================================

/// A role unlocked once a member reaches `num_invites_required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankThreshold {
    pub role_id: RoleId,
    pub num_invites_required: i64,
}

impl RankThreshold {
    pub fn new(role_id: RoleId, num_invites_required: i64) -> Self {
        Self {
            role_id,
            num_invites_required,
        }
    }
}

/// A role as resolved in the guild: hierarchy position and permission bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRole {
    pub id: RoleId,
    pub name: String,
    pub position: i32,
    pub permissions: Permissions,
}

/// Per-guild settings the promotion flow reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub rank_assignment_style: RankAssignmentStyle,
    pub rank_announcement_channel: Option<ChannelId>,
    pub rank_announcement_message: Option<String>,
}

/// A single-key settings write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuildSettingUpdate {
    RankAssignmentStyle(RankAssignmentStyle),
    RankAnnouncementChannel(Option<ChannelId>),
    RankAnnouncementMessage(Option<String>),
}

impl GuildSettingUpdate {
    /// Apply this write to a settings value.
    pub fn apply(&self, settings: &mut GuildSettings) {
        match self {
            GuildSettingUpdate::RankAssignmentStyle(style) => {
                settings.rank_assignment_style = *style;
            }
            GuildSettingUpdate::RankAnnouncementChannel(channel) => {
                settings.rank_announcement_channel = *channel;
            }
            GuildSettingUpdate::RankAnnouncementMessage(message) => {
                settings.rank_announcement_message = message.clone();
            }
        }
    }
}

// ============================================================================
// ROLE CHANGE PLAN
// ============================================================================

/// Why a rank role is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevokeReason {
    /// The member no longer has enough invites for the rank.
    InsufficientInvites,
    /// `highest` assignment style keeps only the top rank.
    NotHighestRank,
}

impl RevokeReason {
    /// Audit log text sent along with the revoke.
    pub fn audit_text(&self) -> &'static str {
        match self {
            RevokeReason::InsufficientInvites => "Not enough invites for rank",
            RevokeReason::NotHighestRank => "Only keeping highest rank",
        }
    }
}

/// Audit log text sent along with rank grants.
pub const GRANT_AUDIT_TEXT: &str = "Reached a new rank by invites";

/// The role changes a promotion evaluation decided on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChangePlan {
    pub roles_to_grant: BTreeSet<RoleId>,
    pub roles_to_revoke: BTreeMap<RoleId, RevokeReason>,
    /// Reached, but positioned above the bot's highest role.
    pub roles_blocked_by_hierarchy: BTreeSet<RoleId>,
    /// Should be removed, but positioned above the bot's highest role.
    pub revocations_blocked_by_hierarchy: BTreeSet<RoleId>,
    /// Reached, but carrying administrative or guild-management bits.
    pub dangerous_roles: BTreeSet<RoleId>,
    pub highest: Option<RoleId>,
    pub next_rank: Option<RankThreshold>,
    pub next_threshold_role_name: Option<String>,
    /// Role to announce as newly reached.
    pub announce: Option<RoleId>,
    /// Configured rank roles that no longer exist in the guild.
    pub unresolved_ranks: Vec<RoleId>,
    pub num_ranks: usize,
    pub manage_roles_available: bool,
}

impl RoleChangePlan {
    /// Whether the plan asks for any role mutation.
    pub fn has_mutations(&self) -> bool {
        !self.roles_to_grant.is_empty() || !self.roles_to_revoke.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    #[test]
    fn test_breakdown_total_is_sum_of_parts() {
        let counts = InviteCountBreakdown::from_parts(5, 2, -1, 0);
        assert_eq!(counts.total, 6);
        assert!(counts.is_consistent());

        let broken = InviteCountBreakdown {
            total: 99,
            ..counts
        };
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_credited_uses_never_negative() {
        let code = InviteCodeRecord {
            guild_id: GuildId::new(1),
            code: "abc".to_string(),
            inviter_id: Some(MemberId::new(2)),
            uses: 3,
            cleared_amount: 5,
            reason: None,
            created_at: Utc::now(),
        };
        assert_eq!(code.credited_uses(), 0);
    }

    #[test]
    fn test_setting_update_applies_single_key() {
        let mut settings = GuildSettings {
            rank_announcement_channel: Some(ChannelId::new(5)),
            ..Default::default()
        };
        GuildSettingUpdate::RankAnnouncementChannel(None).apply(&mut settings);
        assert_eq!(settings.rank_announcement_channel, None);
        assert_eq!(settings.rank_assignment_style, RankAssignmentStyle::All);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(MemberDisplay::new("ann", "0001").full_name(), "ann#0001");
        assert_eq!(MemberDisplay::default().full_name(), "");
    }

    #[test]
    fn test_default_plan_has_no_mutations() {
        assert!(!RoleChangePlan::default().has_mutations());
    }

    proptest! {
        #[test]
        fn prop_from_parts_is_consistent(
            regular in 0i64..10_000,
            custom in -500i64..500,
            fake in 0i64..1_000,
            leave in 0i64..1_000,
        ) {
            let counts = InviteCountBreakdown::from_parts(regular, custom, -fake, -leave);
            prop_assert!(counts.is_consistent());
            prop_assert_eq!(counts.total, regular + custom - fake - leave);
        }
    }
}
