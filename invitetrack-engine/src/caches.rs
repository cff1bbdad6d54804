//! Per-concern guild caches and their loaders.

use std::sync::Arc;

use async_trait::async_trait;
use invitetrack_core::{
    EngineConfig, GuildId, GuildSettingUpdate, GuildSettings, InviteCountBreakdown, InviteResult,
    RankThreshold,
};
use invitetrack_storage::{
    CacheLoader, CacheStats, GuildScoped, InviteStore, KeyedCache, MemberKey, SettingsStore,
};

use crate::accounting::compute_counts;
use crate::premium::PremiumLoader;

/// The caches the engine reads through.
///
/// Nothing here expires on its own. Code that mutates the store calls one of
/// the `invalidate_*` methods afterwards.
pub struct GuildCaches {
    pub counts: KeyedCache<MemberKey, InviteCountBreakdown>,
    pub ranks: KeyedCache<GuildId, Arc<[RankThreshold]>>,
    pub settings: KeyedCache<GuildId, GuildSettings>,
    pub premium: KeyedCache<GuildId, bool>,
}

impl GuildCaches {
    /// Build the caches over one store.
    pub fn new<S>(store: Arc<S>, config: &EngineConfig) -> Self
    where
        S: InviteStore + SettingsStore + 'static,
    {
        Self {
            counts: KeyedCache::new("counts", Arc::new(CountsLoader { store: store.clone() })),
            ranks: KeyedCache::new("ranks", Arc::new(RanksLoader { store: store.clone() })),
            settings: KeyedCache::new("settings", Arc::new(SettingsLoader { store: store.clone() })),
            premium: KeyedCache::new("premium", Arc::new(PremiumLoader::new(store, config.bot_type))),
        }
    }

    /// Write one setting through to the store, then cache the result.
    pub async fn settings_set_one<S>(
        &self,
        store: &S,
        guild_id: GuildId,
        update: &GuildSettingUpdate,
    ) -> InviteResult<GuildSettings>
    where
        S: SettingsStore + ?Sized,
    {
        let settings = store.update_guild_setting(guild_id, update).await?;
        self.settings.invalidate(&guild_id);
        self.settings.set(guild_id, settings.clone());
        tracing::debug!(%guild_id, ?update, "Updated guild setting");
        Ok(settings)
    }

    /// Drop one member's cached counts.
    pub fn invalidate_member(&self, key: &MemberKey) -> bool {
        self.counts.invalidate(key)
    }

    /// Drop every cached count for a guild.
    pub fn invalidate_guild_counts(&self, guild_id: GuildId) -> u64 {
        self.counts.invalidate_guild(guild_id)
    }

    /// Drop everything cached for a guild, across all caches.
    pub fn invalidate_guild(&self, guild_id: GuildId) {
        self.counts.invalidate_guild(guild_id);
        self.ranks.invalidate(&guild_id);
        self.settings.invalidate(&guild_id);
        self.premium.invalidate(&guild_id);
    }

    /// Stats for each cache, by name.
    pub fn stats(&self) -> Vec<(&'static str, CacheStats)> {
        vec![
            (self.counts.name(), self.counts.stats()),
            (self.ranks.name(), self.ranks.stats()),
            (self.settings.name(), self.settings.stats()),
            (self.premium.name(), self.premium.stats()),
        ]
    }
}

impl std::fmt::Debug for GuildCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildCaches")
            .field("counts", &self.counts)
            .field("ranks", &self.ranks)
            .field("settings", &self.settings)
            .field("premium", &self.premium)
            .finish()
    }
}

struct CountsLoader<S: ?Sized> {
    store: Arc<S>,
}

#[async_trait]
impl<S> CacheLoader<MemberKey, InviteCountBreakdown> for CountsLoader<S>
where
    S: InviteStore + ?Sized + 'static,
{
    async fn load(&self, key: &MemberKey) -> InviteResult<InviteCountBreakdown> {
        compute_counts(self.store.as_ref(), key.guild_id(), key.member_id()).await
    }
}

struct RanksLoader<S: ?Sized> {
    store: Arc<S>,
}

#[async_trait]
impl<S> CacheLoader<GuildId, Arc<[RankThreshold]>> for RanksLoader<S>
where
    S: SettingsStore + ?Sized + 'static,
{
    async fn load(&self, guild_id: &GuildId) -> InviteResult<Arc<[RankThreshold]>> {
        Ok(Arc::from(self.store.ranks(*guild_id).await?))
    }
}

struct SettingsLoader<S: ?Sized> {
    store: Arc<S>,
}

#[async_trait]
impl<S> CacheLoader<GuildId, GuildSettings> for SettingsLoader<S>
where
    S: SettingsStore + ?Sized + 'static,
{
    async fn load(&self, guild_id: &GuildId) -> InviteResult<GuildSettings> {
        self.store.guild_settings(*guild_id).await
    }
}
