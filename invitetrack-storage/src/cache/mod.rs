//! Per-guild cache layer.
//!
//! Caches hold materialised results of store queries (invite counts, rank
//! configuration, guild settings, premium state). They are the only component
//! allowed to go stale, and staleness is resolved only by explicit
//! invalidation from the code paths that mutate the store.
//!
//! # Guild Isolation
//!
//! Cache keys implement [`GuildScoped`], so one guild's namespace can be
//! dropped without touching the others. Per-member keys are [`MemberKey`],
//! which cannot be constructed without a guild.
//!
//! # Example
//!
//! ```ignore
//! let counts = KeyedCache::new("counts", loader);
//! let breakdown = counts.get(&MemberKey::new(guild, member)).await?;
//!
//! // After restoring a whole guild's invites
//! counts.invalidate_guild(guild);
//! ```

pub mod guild_key;
pub mod keyed;
pub mod traits;

pub use guild_key::MemberKey;
pub use keyed::KeyedCache;
pub use traits::{CacheLoader, CacheStats, GuildScoped};
