//! Cache loader trait, guild scoping and statistics.

use async_trait::async_trait;
use invitetrack_core::{GuildId, InviteResult};

/// Produces the value for a key on a cache miss.
///
/// Loads must be idempotent functions of store state: concurrent misses on
/// the same key may both call the loader.
#[async_trait]
pub trait CacheLoader<K, V>: Send + Sync {
    async fn load(&self, key: &K) -> InviteResult<V>;
}

/// Keys that belong to exactly one guild.
///
/// Lets a cache drop one guild's namespace without touching the others.
pub trait GuildScoped {
    fn guild_id(&self) -> GuildId;
}

impl GuildScoped for GuildId {
    fn guild_id(&self) -> GuildId {
        *self
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of loader calls that completed successfully.
    pub loads: u64,
    /// Number of entries removed by invalidation.
    pub invalidations: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_guild_id_is_its_own_scope() {
        assert_eq!(GuildId::new(3).guild_id(), GuildId::new(3));
    }
}
