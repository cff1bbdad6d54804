//! Premium state lookup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use invitetrack_core::{BotType, GuildId, InviteResult};
use invitetrack_storage::{CacheLoader, SettingsStore};

/// Loads whether a guild currently has premium.
///
/// Custom bots always have premium. Otherwise the store decides, comparing
/// subscription expiry against the current time.
pub struct PremiumLoader<S: ?Sized> {
    store: Arc<S>,
    bot_type: BotType,
}

impl<S: ?Sized> PremiumLoader<S> {
    pub fn new(store: Arc<S>, bot_type: BotType) -> Self {
        Self { store, bot_type }
    }
}

#[async_trait]
impl<S> CacheLoader<GuildId, bool> for PremiumLoader<S>
where
    S: SettingsStore + ?Sized + 'static,
{
    async fn load(&self, guild_id: &GuildId) -> InviteResult<bool> {
        if self.bot_type == BotType::Custom {
            return Ok(true);
        }
        self.store.has_active_premium(*guild_id, Utc::now()).await
    }
}
