//! Invitetrack Test Utilities
//!
//! Centralized test infrastructure for the invitetrack workspace:
//! - Recording collaborators (role provider, role mutator, messenger)
//! - Proptest generators for aggregate rows and promotion scenarios
//! - Test fixtures for common records
//! - Custom assertions for accounting invariants

pub use invitetrack_storage::InMemoryStore;

pub use invitetrack_core::{
    BotType, ChannelId, CollaboratorError, CustomAdjustmentRow, CustomInviteRecord, EngineConfig,
    GuildId, GuildRole, GuildSettings, InvalidatedJoinRow, InviteCodeRecord, InviteCountBreakdown,
    InviteError, InviteResult, JoinInvalidatedReason, JoinRecord, LeaderboardEntry, MemberDisplay,
    MemberId, MessageId, Permissions, RankAssignmentStyle, RankThreshold, RegularCreditRow,
    RoleChangePlan, RoleId,
};
pub use invitetrack_engine::{
    BotMember, GuildRoleProvider, GuildRoles, MemberSnapshot, Messenger, PromotionInput,
    RenderedMessage, RoleMutator,
};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

// ============================================================================
// RECORDING COLLABORATORS
// ============================================================================

/// Role provider backed by fixed data.
#[derive(Debug, Default)]
pub struct StaticGuildRoles {
    roles: Mutex<Vec<GuildRole>>,
    members: Mutex<HashMap<MemberId, MemberSnapshot>>,
    bot: Mutex<BotMember>,
    calls: AtomicU64,
}

impl StaticGuildRoles {
    pub fn new(roles: Vec<GuildRole>, bot: BotMember) -> Self {
        Self {
            roles: Mutex::new(roles),
            bot: Mutex::new(bot),
            ..Self::default()
        }
    }

    /// Add or replace a member.
    pub fn with_member(self, member: MemberSnapshot) -> Self {
        self.set_member(member);
        self
    }

    pub fn set_member(&self, member: MemberSnapshot) {
        self.members
            .lock()
            .expect("members lock")
            .insert(member.id, member);
    }

    pub fn set_bot(&self, bot: BotMember) {
        *self.bot.lock().expect("bot lock") = bot;
    }

    /// Number of provider calls made so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuildRoleProvider for StaticGuildRoles {
    async fn guild_roles(&self, _guild_id: GuildId) -> InviteResult<GuildRoles> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GuildRoles::new(self.roles.lock().expect("roles lock").clone()))
    }

    async fn member(&self, guild_id: GuildId, member_id: MemberId) -> InviteResult<MemberSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.members
            .lock()
            .expect("members lock")
            .get(&member_id)
            .cloned()
            .ok_or_else(|| {
                InviteError::from(CollaboratorError::GuildUnavailable {
                    guild_id,
                    reason: format!("unknown member {member_id}"),
                })
            })
    }

    async fn bot_member(&self, _guild_id: GuildId) -> InviteResult<BotMember> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bot.lock().expect("bot lock").clone())
    }
}

/// A role change as seen by [`RecordingRoleMutator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCall {
    Grant { role_id: RoleId, reason: String },
    Revoke { role_id: RoleId, reason: String },
}

/// Role mutator that records every call and fails on chosen roles.
#[derive(Debug, Default)]
pub struct RecordingRoleMutator {
    calls: Mutex<Vec<RoleCall>>,
    failing: Mutex<HashSet<RoleId>>,
}

impl RecordingRoleMutator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call touching `role_id` fail.
    pub fn fail_on(&self, role_id: RoleId) {
        self.failing.lock().expect("failing lock").insert(role_id);
    }

    pub fn calls(&self) -> Vec<RoleCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: RoleCall, role_id: RoleId) -> bool {
        self.calls.lock().expect("calls lock").push(call);
        !self.failing.lock().expect("failing lock").contains(&role_id)
    }
}

#[async_trait]
impl RoleMutator for RecordingRoleMutator {
    async fn grant_role(
        &self,
        _guild_id: GuildId,
        _member_id: MemberId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), CollaboratorError> {
        let call = RoleCall::Grant {
            role_id,
            reason: reason.to_string(),
        };
        if self.record(call, role_id) {
            Ok(())
        } else {
            Err(CollaboratorError::GrantFailed {
                role_id,
                reason: "missing access".to_string(),
            })
        }
    }

    async fn revoke_role(
        &self,
        _guild_id: GuildId,
        _member_id: MemberId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), CollaboratorError> {
        let call = RoleCall::Revoke {
            role_id,
            reason: reason.to_string(),
        };
        if self.record(call, role_id) {
            Ok(())
        } else {
            Err(CollaboratorError::RevokeFailed {
                role_id,
                reason: "missing access".to_string(),
            })
        }
    }
}

/// Messenger that records sent messages and reactions.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    channels: Mutex<HashSet<ChannelId>>,
    sent: Mutex<Vec<(ChannelId, RenderedMessage)>>,
    reactions: Mutex<Vec<(MessageId, String)>>,
    fail_sends: Mutex<bool>,
    next_message_id: AtomicU64,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messenger that knows about `channels`.
    pub fn with_channels(channels: impl IntoIterator<Item = ChannelId>) -> Self {
        let messenger = Self::new();
        messenger
            .channels
            .lock()
            .expect("channels lock")
            .extend(channels);
        messenger
    }

    pub fn set_fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().expect("fail lock") = fail;
    }

    pub fn sent(&self) -> Vec<(ChannelId, RenderedMessage)> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn reactions(&self) -> Vec<(MessageId, String)> {
        self.reactions.lock().expect("reactions lock").clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn channel_exists(&self, _guild_id: GuildId, channel_id: ChannelId) -> InviteResult<bool> {
        Ok(self
            .channels
            .lock()
            .expect("channels lock")
            .contains(&channel_id))
    }

    async fn send(
        &self,
        channel_id: ChannelId,
        message: &RenderedMessage,
    ) -> Result<MessageId, CollaboratorError> {
        if *self.fail_sends.lock().expect("fail lock") {
            return Err(CollaboratorError::SendFailed {
                channel_id,
                reason: "missing permissions".to_string(),
            });
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push((channel_id, message.clone()));
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageId::new(id))
    }

    async fn add_reaction(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<(), CollaboratorError> {
        self.reactions
            .lock()
            .expect("reactions lock")
            .push((message_id, emoji.to_string()));
        Ok(())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for invitetrack inputs.

    use super::*;
    use proptest::prelude::*;

    /// Role id used for the bot's own role in generated scenarios.
    pub const BOT_ROLE: RoleId = RoleId::new(900);
    /// Rank role id that never exists in generated guilds.
    pub const MISSING_ROLE: RoleId = RoleId::new(999);

    pub fn arb_member_id() -> impl Strategy<Value = MemberId> {
        (1u64..8).prop_map(MemberId::new)
    }

    pub fn arb_display() -> impl Strategy<Value = MemberDisplay> {
        prop_oneof![
            4 => "[a-zA-Z]{1,6}".prop_map(|name| MemberDisplay::new(name, "0001")),
            1 => Just(MemberDisplay::default()),
        ]
    }

    pub fn arb_reason() -> impl Strategy<Value = JoinInvalidatedReason> {
        prop_oneof![
            Just(JoinInvalidatedReason::Fake),
            Just(JoinInvalidatedReason::Leave),
        ]
    }

    pub fn arb_style() -> impl Strategy<Value = RankAssignmentStyle> {
        prop_oneof![
            Just(RankAssignmentStyle::All),
            Just(RankAssignmentStyle::Highest),
        ]
    }

    pub fn arb_regular_row() -> impl Strategy<Value = RegularCreditRow> {
        (arb_member_id(), arb_display(), 1i64..50).prop_map(|(inviter_id, display, total)| {
            RegularCreditRow {
                inviter_id,
                display,
                total,
            }
        })
    }

    pub fn arb_invalidated_row() -> impl Strategy<Value = InvalidatedJoinRow> {
        (arb_member_id(), arb_display(), arb_reason(), 1i64..20).prop_map(
            |(inviter_id, display, reason, total)| InvalidatedJoinRow {
                inviter_id,
                display,
                reason,
                total,
            },
        )
    }

    pub fn arb_custom_row() -> impl Strategy<Value = CustomAdjustmentRow> {
        (arb_member_id(), arb_display(), -10i64..30).prop_map(|(member_id, display, total)| {
            CustomAdjustmentRow {
                member_id,
                display,
                total,
            }
        })
    }

    /// The three leaderboard sources.
    ///
    /// Display names are made consistent per member, as they are when all
    /// sources read the same member row.
    pub fn arb_leaderboard_sources() -> impl Strategy<
        Value = (
            Vec<RegularCreditRow>,
            Vec<InvalidatedJoinRow>,
            Vec<CustomAdjustmentRow>,
        ),
    > {
        (
            prop::collection::vec(arb_regular_row(), 0..10),
            prop::collection::vec(arb_invalidated_row(), 0..10),
            prop::collection::vec(arb_custom_row(), 0..10),
            prop::collection::vec(arb_display(), 8),
        )
            .prop_map(|(mut regular, mut invalidated, mut custom, displays)| {
                let display_for = |id: MemberId| displays[id.get() as usize].clone();
                for row in &mut regular {
                    row.display = display_for(row.inviter_id);
                }
                for row in &mut invalidated {
                    row.display = display_for(row.inviter_id);
                }
                for row in &mut custom {
                    row.display = display_for(row.member_id);
                }
                (regular, invalidated, custom)
            })
    }

    /// A complete promotion evaluation input.
    #[derive(Debug, Clone)]
    pub struct PromotionScenario {
        pub total_invites: i64,
        pub ranks: Vec<RankThreshold>,
        pub guild_roles: Vec<GuildRole>,
        pub member_roles: BTreeSet<RoleId>,
        pub bot_roles: Vec<RoleId>,
        pub bot_has_manage_roles: bool,
        pub style: RankAssignmentStyle,
    }

    impl PromotionScenario {
        pub fn roles(&self) -> GuildRoles {
            GuildRoles::new(self.guild_roles.clone())
        }

        pub fn input<'a>(&'a self, roles: &'a GuildRoles) -> PromotionInput<'a> {
            PromotionInput {
                total_invites: self.total_invites,
                ranks: &self.ranks,
                guild_roles: roles,
                member_roles: &self.member_roles,
                bot_roles: &self.bot_roles,
                bot_has_manage_roles: self.bot_has_manage_roles,
                style: self.style,
            }
        }

        /// Position of the bot's highest role, 0 without roles.
        pub fn bot_position(&self) -> i32 {
            self.guild_roles
                .iter()
                .filter(|role| self.bot_roles.contains(&role.id))
                .map(|role| role.position)
                .max()
                .unwrap_or(0)
        }
    }

    /// Rank roles 1..=n at positions 1..=n, each with a random threshold,
    /// elevation and membership; a bot role at a random position.
    pub fn arb_promotion_scenario() -> impl Strategy<Value = PromotionScenario> {
        (
            prop::collection::vec((0i64..20, prop::bool::weighted(0.2), any::<bool>()), 1..6),
            0i32..8,
            -5i64..25,
            prop::bool::weighted(0.8),
            arb_style(),
            any::<bool>(),
        )
            .prop_map(
                |(specs, bot_position, total_invites, manage, style, with_missing)| {
                    let mut ranks = Vec::new();
                    let mut guild_roles = Vec::new();
                    let mut member_roles = BTreeSet::new();

                    for (i, (threshold, elevated, held)) in specs.into_iter().enumerate() {
                        let id = RoleId::new(i as u64 + 1);
                        ranks.push(RankThreshold::new(id, threshold));
                        guild_roles.push(GuildRole {
                            id,
                            name: format!("rank-{}", i + 1),
                            position: i as i32 + 1,
                            permissions: if elevated {
                                Permissions::ADMINISTRATOR
                            } else {
                                Permissions::SEND_MESSAGES
                            },
                        });
                        if held {
                            member_roles.insert(id);
                        }
                    }
                    if with_missing {
                        ranks.push(RankThreshold::new(MISSING_ROLE, 0));
                    }

                    let mut bot_roles = Vec::new();
                    if bot_position > 0 {
                        guild_roles.push(GuildRole {
                            id: BOT_ROLE,
                            name: "bot".to_string(),
                            position: bot_position,
                            permissions: Permissions::MANAGE_ROLES,
                        });
                        bot_roles.push(BOT_ROLE);
                    }

                    PromotionScenario {
                        total_invites,
                        ranks,
                        guild_roles,
                        member_roles,
                        bot_roles,
                        bot_has_manage_roles: manage,
                        style,
                    }
                },
            )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;
    use chrono::Utc;
    use invitetrack_core::new_record_id;

    pub const GUILD: GuildId = GuildId::new(1);
    pub const ALICE: MemberId = MemberId::new(10);
    pub const BOB: MemberId = MemberId::new(20);
    pub const CAROL: MemberId = MemberId::new(30);
    pub const ANNOUNCE_CHANNEL: ChannelId = ChannelId::new(500);

    pub fn invite_code(code: &str, inviter: MemberId, uses: i64) -> InviteCodeRecord {
        InviteCodeRecord {
            guild_id: GUILD,
            code: code.to_string(),
            inviter_id: Some(inviter),
            uses,
            cleared_amount: 0,
            reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn join_via(code: &str, member: MemberId) -> JoinRecord {
        JoinRecord {
            id: new_record_id(),
            guild_id: GUILD,
            member_id: member,
            exact_match_code: Some(code.to_string()),
            invalidated_reason: None,
            cleared: false,
            created_at: Utc::now(),
        }
    }

    pub fn custom_invite(member: MemberId, amount: i64) -> CustomInviteRecord {
        CustomInviteRecord {
            id: new_record_id(),
            guild_id: GUILD,
            member_id: member,
            creator_id: None,
            amount,
            reason: None,
            generated_reason: None,
            cleared: false,
            created_at: Utc::now(),
        }
    }

    pub fn role(id: u64, position: i32) -> GuildRole {
        GuildRole {
            id: RoleId::new(id),
            name: format!("role-{id}"),
            position,
            permissions: Permissions::SEND_MESSAGES,
        }
    }

    pub fn member(id: MemberId, name: &str, roles: &[RoleId]) -> MemberSnapshot {
        MemberSnapshot {
            id,
            display: MemberDisplay::new(name, "0001"),
            avatar_url: Some(format!("https://cdn.example/{name}.png")),
            role_ids: roles.iter().copied().collect(),
        }
    }

    /// A store holding: Alice with 5 code uses, a +2 custom bonus and one
    /// fake join (breakdown 5 / 2 / -1 / 0).
    pub fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .upsert_member(ALICE, MemberDisplay::new("alice", "0001"))
            .expect("seed member");
        store
            .insert_invite_code(invite_code("alice-a", ALICE, 5))
            .expect("seed code");
        store
            .insert_custom_invite(custom_invite(ALICE, 2))
            .expect("seed custom");
        let fake = join_via("alice-a", BOB);
        let fake_id = fake.id;
        store.insert_join(fake).expect("seed join");
        store
            .invalidate_join(fake_id, JoinInvalidatedReason::Fake)
            .expect("seed fake");
        store
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for accounting invariants.

    use super::*;

    /// Assert the sign and sum invariants of a breakdown.
    #[track_caller]
    pub fn assert_consistent(counts: &InviteCountBreakdown) {
        assert!(counts.is_consistent(), "Inconsistent breakdown: {:?}", counts);
    }

    /// Assert that every entry is positive and the order is total
    /// descending, then name ascending with unnamed entries last.
    #[track_caller]
    pub fn assert_ranked(entries: &[LeaderboardEntry]) {
        for entry in entries {
            assert!(entry.total > 0, "Non-positive entry: {:?}", entry);
        }
        for pair in entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.total >= b.total, "Not descending: {:?} then {:?}", a, b);
            if a.total == b.total {
                match (&a.name, &b.name) {
                    (Some(x), Some(y)) => assert!(x <= y, "Names out of order: {:?} {:?}", a, b),
                    (None, Some(_)) => panic!("Unnamed entry before named: {:?} {:?}", a, b),
                    _ => {}
                }
            }
        }
    }

    /// Assert that a plan changes nothing.
    #[track_caller]
    pub fn assert_no_mutations(plan: &RoleChangePlan) {
        assert!(
            plan.roles_to_grant.is_empty() && plan.roles_to_revoke.is_empty(),
            "Expected no mutations, got {:?}",
            plan
        );
    }
}
