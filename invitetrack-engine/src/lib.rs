//! Invitetrack Engine - Invite Accounting and Rank Promotion
//!
//! Computes per-member invite credit from the store, builds guild
//! leaderboards, and keeps members' rank roles in line with their credit.
//!
//! # Layout
//!
//! - [`accounting`] and [`leaderboard`]: pure folds over store aggregates
//! - [`promotion`]: the pure role-change decision
//! - [`executor`]: applies a plan through a [`RoleMutator`]
//! - [`ledger`]: [`InviteLedger`], the cached facade over all of the above

pub mod accounting;
pub mod caches;
pub mod collaborators;
pub mod executor;
pub mod leaderboard;
pub mod ledger;
pub mod premium;
pub mod promotion;
pub mod report;
pub mod restore;
pub mod telemetry;
pub mod template;

pub use accounting::{compute_counts, fold_counts};
pub use caches::GuildCaches;
pub use collaborators::{
    BotMember, GuildRoleProvider, GuildRoles, MemberSnapshot, Messenger, RoleMutator,
};
pub use executor::{apply_plan, planned_mutations, MutationOutcome, RoleMutation};
pub use leaderboard::{
    build_leaderboard, leaderboard_from_rows, merge_contributions, rank_entries, tag_sources,
    SourceContribution,
};
pub use ledger::{announcement_vars, AnnouncementOutcome, InviteLedger, PromotionOutcome};
pub use premium::PremiumLoader;
pub use promotion::{evaluate, PromotionInput};
pub use report::{member_invite_report, MemberInviteReport};
pub use restore::{clear_invites, restore_invites, CreditChangeSummary};
pub use telemetry::{init_tracing, TelemetryConfig};
pub use template::{fill_template, invite_count_vars, RenderedMessage, TemplateVars};
