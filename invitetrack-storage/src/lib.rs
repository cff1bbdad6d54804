//! Invitetrack Storage - Store Traits, In-Memory Store and Cache
//!
//! Defines the store abstraction the accounting core queries, an in-memory
//! implementation used by tests, and the keyed cache that keeps accounting
//! results fast between mutations.

pub mod cache;
pub mod memory;
pub mod store;

pub use cache::{CacheLoader, CacheStats, GuildScoped, KeyedCache, MemberKey};
pub use memory::InMemoryStore;
pub use store::{InviteStore, JoinSelector, SettingsStore};
