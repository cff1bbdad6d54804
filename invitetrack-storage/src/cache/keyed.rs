//! Lazily populated keyed cache with explicit invalidation.
//!
//! Entries live until they are invalidated; there is no TTL. Writers that
//! mutate the store must invalidate the affected keys before the next read
//! is guaranteed fresh.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use invitetrack_core::{GuildId, InviteResult};

use super::traits::{CacheLoader, CacheStats, GuildScoped};

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    invalidations: AtomicU64,
}

/// Keyed cache that fills misses through a [`CacheLoader`].
///
/// Backed by a sharded `DashMap`; no shard lock is held while the loader
/// runs. Concurrent misses on one key may both load, last write wins.
///
/// # Example
///
/// ```ignore
/// let counts = KeyedCache::new("counts", Arc::new(CountsLoader::new(store)));
/// let breakdown = counts.get(&MemberKey::new(guild, member)).await?;
///
/// // After clearing a member's invites
/// counts.invalidate(&MemberKey::new(guild, member));
/// ```
pub struct KeyedCache<K, V> {
    name: &'static str,
    entries: DashMap<K, V>,
    loader: Arc<dyn CacheLoader<K, V>>,
    /// Bumped by every invalidation; loads that straddle one are not stored.
    epoch: AtomicU64,
    counters: Counters,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new(name: &'static str, loader: Arc<dyn CacheLoader<K, V>>) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            loader,
            epoch: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    /// Cache name, used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the cached value, loading and storing it on a miss.
    ///
    /// A loader error is returned as-is and nothing is stored.
    pub async fn get(&self, key: &K) -> InviteResult<V> {
        let cached = self.entries.get(key).map(|entry| entry.value().clone());
        if let Some(value) = cached {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let epoch = self.epoch.load(Ordering::Acquire);
        let value = self.loader.load(key).await?;
        self.counters.loads.fetch_add(1, Ordering::Relaxed);

        // The epoch is re-read under the shard lock. Invalidations bump the
        // epoch before removing, so a bump after this check waits for the lock
        // and then removes what was inserted here.
        let entry = self.entries.entry(key.clone());
        if self.epoch.load(Ordering::Acquire) == epoch {
            entry.insert(value.clone());
        } else {
            drop(entry);
            tracing::debug!(cache = self.name, ?key, "Load raced an invalidation, not caching");
        }
        Ok(value)
    }

    /// Get the cached value without loading.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store a value directly.
    pub fn set(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Remove one entry. Returns whether an entry was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(cache = self.name, ?key, removed, "Invalidated cache entry");
        removed
    }

    /// Remove every entry matching `predicate`. Returns how many were removed.
    pub fn invalidate_where<F>(&self, predicate: F) -> u64
    where
        F: Fn(&K) -> bool,
    {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        let removed = before.saturating_sub(self.entries.len()) as u64;
        self.counters
            .invalidations
            .fetch_add(removed, Ordering::Relaxed);
        removed
    }

    /// Remove every entry.
    pub fn invalidate_all(&self) -> u64 {
        let removed = self.invalidate_where(|_| true);
        tracing::debug!(cache = self.name, removed, "Invalidated whole cache");
        removed
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
        }
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: GuildScoped + Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Remove every entry belonging to one guild.
    pub fn invalidate_guild(&self, guild_id: GuildId) -> u64 {
        let removed = self.invalidate_where(|key| key.guild_id() == guild_id);
        tracing::debug!(cache = self.name, %guild_id, removed, "Invalidated guild namespace");
        removed
    }
}

impl<K: Eq + Hash, V> Debug for KeyedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCache")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}
