//! Invitetrack Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! Invite records and aggregate rows, computed breakdowns and leaderboard
//! entries, rank thresholds, role hierarchy snapshots, role change plans,
//! the error taxonomy and engine configuration.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod permissions;

pub use config::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use permissions::*;
