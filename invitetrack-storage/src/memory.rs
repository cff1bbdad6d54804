//! In-memory store for tests and local runs.
//!
//! Aggregations mirror what the SQL-backed store computes: grouping is done
//! through `BTreeMap`s so row order is deterministic.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use invitetrack_core::{
    CustomAdjustmentRow, CustomInviteRecord, GuildId, GuildSettingUpdate, GuildSettings,
    InvalidatedJoinRow, InviteCodeRecord, InviteResult, JoinInvalidatedReason, JoinRecord,
    MemberDisplay, MemberId, PremiumSubscription, RankThreshold, RecordId, RegularCreditRow,
    StoreError, Timestamp,
};

use crate::store::{InviteStore, JoinSelector, SettingsStore};

#[derive(Debug, Default)]
struct Tables {
    members: HashMap<MemberId, MemberDisplay>,
    invite_codes: Vec<InviteCodeRecord>,
    joins: Vec<JoinRecord>,
    custom_invites: Vec<CustomInviteRecord>,
    ranks: HashMap<GuildId, Vec<RankThreshold>>,
    settings: HashMap<GuildId, GuildSettings>,
    premium: Vec<PremiumSubscription>,
}

impl Tables {
    fn display(&self, member_id: MemberId) -> MemberDisplay {
        self.members.get(&member_id).cloned().unwrap_or_default()
    }

    /// Inviter of the code a join matched, if the code is known and owned.
    fn join_inviter(&self, join: &JoinRecord) -> Option<MemberId> {
        let code = join.exact_match_code.as_deref()?;
        self.invite_codes
            .iter()
            .find(|c| c.guild_id == join.guild_id && c.code == code)
            .and_then(|c| c.inviter_id)
    }
}

/// In-memory store.
///
/// `set_failing(true)` makes every subsequent call fail with
/// [`StoreError::QueryFailed`] / [`StoreError::MutationFailed`], and
/// `call_count()` reports how many trait calls were made.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    failing: AtomicBool,
    calls: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn begin_query(&self, query: &'static str, guild_id: GuildId) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::QueryFailed {
                query,
                guild_id,
                reason: "store unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn begin_mutation(&self, operation: &'static str, guild_id: GuildId) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::MutationFailed {
                operation,
                guild_id,
                reason: "store unavailable".to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // TEST CONTROLS
    // ========================================================================

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of trait calls served so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    // ========================================================================
    // SEEDING
    // ========================================================================

    /// Insert or replace a member's display metadata.
    pub fn upsert_member(&self, member_id: MemberId, display: MemberDisplay) -> InviteResult<()> {
        self.write()?.members.insert(member_id, display);
        Ok(())
    }

    /// Insert an invite code, replacing one with the same guild and code.
    pub fn insert_invite_code(&self, record: InviteCodeRecord) -> InviteResult<()> {
        let mut tables = self.write()?;
        tables
            .invite_codes
            .retain(|c| !(c.guild_id == record.guild_id && c.code == record.code));
        tables.invite_codes.push(record);
        Ok(())
    }

    /// Insert a join.
    pub fn insert_join(&self, record: JoinRecord) -> InviteResult<()> {
        self.write()?.joins.push(record);
        Ok(())
    }

    /// Mark an existing join invalid.
    pub fn invalidate_join(
        &self,
        join_id: RecordId,
        reason: JoinInvalidatedReason,
    ) -> InviteResult<()> {
        let mut tables = self.write()?;
        let join = tables
            .joins
            .iter_mut()
            .find(|j| j.id == join_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "join",
                id: join_id.to_string(),
            })?;
        join.invalidated_reason = Some(reason);
        Ok(())
    }

    /// Insert a custom invite record.
    pub fn insert_custom_invite(&self, record: CustomInviteRecord) -> InviteResult<()> {
        self.write()?.custom_invites.push(record);
        Ok(())
    }

    /// Replace a guild's rank configuration.
    pub fn set_ranks(&self, guild_id: GuildId, ranks: Vec<RankThreshold>) -> InviteResult<()> {
        self.write()?.ranks.insert(guild_id, ranks);
        Ok(())
    }

    /// Replace a guild's settings.
    pub fn set_settings(&self, guild_id: GuildId, settings: GuildSettings) -> InviteResult<()> {
        self.write()?.settings.insert(guild_id, settings);
        Ok(())
    }

    /// Attach a premium subscription.
    pub fn insert_premium(&self, subscription: PremiumSubscription) -> InviteResult<()> {
        self.write()?.premium.push(subscription);
        Ok(())
    }
}

#[async_trait]
impl InviteStore for InMemoryStore {
    async fn query_regular_credit(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<Vec<RegularCreditRow>> {
        self.begin_query("regular_credit", guild_id)?;
        let tables = self.read()?;

        let mut sums: BTreeMap<MemberId, i64> = BTreeMap::new();
        for code in &tables.invite_codes {
            let Some(inviter) = code.inviter_id else {
                continue;
            };
            if code.guild_id != guild_id || code.uses <= code.cleared_amount {
                continue;
            }
            if member_id.is_some_and(|m| m != inviter) {
                continue;
            }
            *sums.entry(inviter).or_default() += code.uses - code.cleared_amount;
        }

        Ok(sums
            .into_iter()
            .map(|(inviter_id, total)| RegularCreditRow {
                inviter_id,
                display: tables.display(inviter_id),
                total,
            })
            .collect())
    }

    async fn query_invalidated_joins(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<Vec<InvalidatedJoinRow>> {
        self.begin_query("invalidated_joins", guild_id)?;
        let tables = self.read()?;

        let mut counts: BTreeMap<(MemberId, JoinInvalidatedReason), i64> = BTreeMap::new();
        for join in &tables.joins {
            if join.guild_id != guild_id || join.cleared {
                continue;
            }
            let Some(reason) = join.invalidated_reason else {
                continue;
            };
            // Joins without a resolvable inviter credit nobody.
            let Some(inviter) = tables.join_inviter(join) else {
                continue;
            };
            if member_id.is_some_and(|m| m != inviter) {
                continue;
            }
            *counts.entry((inviter, reason)).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|((inviter_id, reason), total)| InvalidatedJoinRow {
                inviter_id,
                display: tables.display(inviter_id),
                reason,
                total,
            })
            .collect())
    }

    async fn query_custom_adjustments(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<Vec<CustomAdjustmentRow>> {
        self.begin_query("custom_adjustments", guild_id)?;
        let tables = self.read()?;

        let mut sums: BTreeMap<MemberId, i64> = BTreeMap::new();
        for custom in &tables.custom_invites {
            if custom.guild_id != guild_id || custom.cleared {
                continue;
            }
            if member_id.is_some_and(|m| m != custom.member_id) {
                continue;
            }
            *sums.entry(custom.member_id).or_default() += custom.amount;
        }

        Ok(sums
            .into_iter()
            .map(|(member_id, total)| CustomAdjustmentRow {
                member_id,
                display: tables.display(member_id),
                total,
            })
            .collect())
    }

    async fn invite_codes_for(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<Vec<InviteCodeRecord>> {
        self.begin_query("invite_codes_for", guild_id)?;
        let tables = self.read()?;
        let mut codes: Vec<InviteCodeRecord> = tables
            .invite_codes
            .iter()
            .filter(|c| c.guild_id == guild_id && c.inviter_id == Some(member_id))
            .cloned()
            .collect();
        codes.sort_by(|a, b| b.uses.cmp(&a.uses));
        Ok(codes)
    }

    async fn custom_invites_for(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> InviteResult<Vec<CustomInviteRecord>> {
        self.begin_query("custom_invites_for", guild_id)?;
        let tables = self.read()?;
        let mut records: Vec<CustomInviteRecord> = tables
            .custom_invites
            .iter()
            .filter(|c| c.guild_id == guild_id && c.member_id == member_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn count_joins(&self, guild_id: GuildId, member_id: MemberId) -> InviteResult<u64> {
        self.begin_query("count_joins", guild_id)?;
        let tables = self.read()?;
        Ok(tables
            .joins
            .iter()
            .filter(|j| j.guild_id == guild_id && j.member_id == member_id)
            .count() as u64)
    }

    async fn clear_invite_codes(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<u64> {
        self.begin_mutation("clear_invite_codes", guild_id)?;
        let mut tables = self.write()?;
        let mut touched = 0;
        for code in tables.invite_codes.iter_mut() {
            if code.guild_id == guild_id && owned_by(code, member_id) {
                code.cleared_amount = code.uses;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn restore_invite_codes(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
    ) -> InviteResult<u64> {
        self.begin_mutation("restore_invite_codes", guild_id)?;
        let mut tables = self.write()?;
        let mut touched = 0;
        for code in tables.invite_codes.iter_mut() {
            if code.guild_id == guild_id && owned_by(code, member_id) {
                code.cleared_amount = 0;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn mark_joins_cleared(
        &self,
        guild_id: GuildId,
        selector: &JoinSelector,
        cleared: bool,
    ) -> InviteResult<u64> {
        self.begin_mutation("mark_joins_cleared", guild_id)?;
        let mut tables = self.write()?;
        let mut touched = 0;
        for join in tables.joins.iter_mut() {
            if join.guild_id != guild_id {
                continue;
            }
            let selected = match selector {
                JoinSelector::AllInGuild => true,
                JoinSelector::ExactMatchCodes(codes) => join
                    .exact_match_code
                    .as_ref()
                    .is_some_and(|code| codes.contains(code)),
            };
            if selected {
                join.cleared = cleared;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn mark_custom_invites_cleared(
        &self,
        guild_id: GuildId,
        member_id: Option<MemberId>,
        cleared: bool,
    ) -> InviteResult<u64> {
        self.begin_mutation("mark_custom_invites_cleared", guild_id)?;
        let mut tables = self.write()?;
        let mut touched = 0;
        for custom in tables.custom_invites.iter_mut() {
            if custom.guild_id == guild_id && member_id.map_or(true, |m| m == custom.member_id) {
                custom.cleared = cleared;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

fn owned_by(code: &InviteCodeRecord, member_id: Option<MemberId>) -> bool {
    match (code.inviter_id, member_id) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(inviter), Some(member)) => inviter == member,
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn ranks(&self, guild_id: GuildId) -> InviteResult<Vec<RankThreshold>> {
        self.begin_query("ranks", guild_id)?;
        Ok(self.read()?.ranks.get(&guild_id).cloned().unwrap_or_default())
    }

    async fn guild_settings(&self, guild_id: GuildId) -> InviteResult<GuildSettings> {
        self.begin_query("guild_settings", guild_id)?;
        Ok(self
            .read()?
            .settings
            .get(&guild_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_guild_setting(
        &self,
        guild_id: GuildId,
        update: &GuildSettingUpdate,
    ) -> InviteResult<GuildSettings> {
        self.begin_mutation("update_guild_setting", guild_id)?;
        let mut tables = self.write()?;
        let settings = tables.settings.entry(guild_id).or_default();
        update.apply(settings);
        Ok(settings.clone())
    }

    async fn has_active_premium(&self, guild_id: GuildId, now: Timestamp) -> InviteResult<bool> {
        self.begin_query("premium", guild_id)?;
        Ok(self
            .read()?
            .premium
            .iter()
            .any(|s| s.guild_id == guild_id && s.valid_until >= now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use invitetrack_core::{new_record_id, InviteError};

    const GUILD: GuildId = GuildId::new(1);
    const ALICE: MemberId = MemberId::new(10);
    const BOB: MemberId = MemberId::new(20);

    fn code(code: &str, inviter: Option<MemberId>, uses: i64, cleared: i64) -> InviteCodeRecord {
        InviteCodeRecord {
            guild_id: GUILD,
            code: code.to_string(),
            inviter_id: inviter,
            uses,
            cleared_amount: cleared,
            reason: None,
            created_at: Utc::now(),
        }
    }

    fn join(member: MemberId, code: &str, reason: Option<JoinInvalidatedReason>) -> JoinRecord {
        JoinRecord {
            id: new_record_id(),
            guild_id: GUILD,
            member_id: member,
            exact_match_code: Some(code.to_string()),
            invalidated_reason: reason,
            cleared: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_regular_credit_skips_fully_cleared_codes() {
        let store = InMemoryStore::new();
        store.insert_invite_code(code("a", Some(ALICE), 5, 2)).unwrap();
        store.insert_invite_code(code("b", Some(ALICE), 3, 3)).unwrap();
        store.insert_invite_code(code("c", Some(ALICE), 1, 4)).unwrap();
        store.insert_invite_code(code("vanity", None, 50, 0)).unwrap();

        let rows = store.query_regular_credit(GUILD, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].inviter_id, ALICE);
        assert_eq!(rows[0].total, 3);
    }

    #[tokio::test]
    async fn test_invalidated_joins_group_by_inviter_and_reason() {
        let store = InMemoryStore::new();
        store.insert_invite_code(code("a", Some(ALICE), 3, 0)).unwrap();
        store.insert_invite_code(code("b", Some(BOB), 3, 0)).unwrap();
        store
            .insert_join(join(MemberId::new(100), "a", Some(JoinInvalidatedReason::Fake)))
            .unwrap();
        store
            .insert_join(join(MemberId::new(101), "a", Some(JoinInvalidatedReason::Fake)))
            .unwrap();
        store
            .insert_join(join(MemberId::new(102), "a", Some(JoinInvalidatedReason::Leave)))
            .unwrap();
        store.insert_join(join(MemberId::new(103), "b", None)).unwrap();
        store
            .insert_join(join(MemberId::new(104), "unknown", Some(JoinInvalidatedReason::Leave)))
            .unwrap();

        let rows = store.query_invalidated_joins(GUILD, None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].reason, rows[0].total), (JoinInvalidatedReason::Fake, 2));
        assert_eq!((rows[1].reason, rows[1].total), (JoinInvalidatedReason::Leave, 1));

        let bob_rows = store.query_invalidated_joins(GUILD, Some(BOB)).await.unwrap();
        assert!(bob_rows.is_empty());
    }

    #[tokio::test]
    async fn test_clear_and_restore_codes() {
        let store = InMemoryStore::new();
        store.insert_invite_code(code("a", Some(ALICE), 5, 0)).unwrap();
        store.insert_invite_code(code("b", Some(BOB), 2, 0)).unwrap();

        assert_eq!(store.clear_invite_codes(GUILD, Some(ALICE)).await.unwrap(), 1);
        let rows = store.query_regular_credit(GUILD, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].inviter_id, BOB);

        assert_eq!(store.restore_invite_codes(GUILD, None).await.unwrap(), 2);
        let rows = store.query_regular_credit(GUILD, None).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_settings_update_writes_single_key() {
        let store = InMemoryStore::new();
        let updated = store
            .update_guild_setting(
                GUILD,
                &GuildSettingUpdate::RankAnnouncementMessage(Some("hi".to_string())),
            )
            .await
            .unwrap();
        assert_eq!(updated.rank_announcement_message.as_deref(), Some("hi"));
        assert_eq!(store.guild_settings(GUILD).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_premium_respects_valid_until() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_premium(PremiumSubscription {
                guild_id: GUILD,
                valid_until: now - Duration::days(1),
            })
            .unwrap();
        assert!(!store.has_active_premium(GUILD, now).await.unwrap());
        store
            .insert_premium(PremiumSubscription {
                guild_id: GUILD,
                valid_until: now + Duration::days(30),
            })
            .unwrap();
        assert!(store.has_active_premium(GUILD, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_store_reports_query_failure() {
        let store = InMemoryStore::new();
        store.set_failing(true);
        let err = store.query_custom_adjustments(GUILD, None).await.unwrap_err();
        assert!(matches!(
            err,
            InviteError::Store(StoreError::QueryFailed { query: "custom_adjustments", .. })
        ));
        assert_eq!(store.call_count(), 1);
    }
}
