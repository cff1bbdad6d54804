//! Error types for invitetrack operations

use crate::{ChannelId, GuildId, RoleId};
use thiserror::Error;

/// Store layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Query {query} failed for guild {guild_id}: {reason}")]
    QueryFailed {
        query: &'static str,
        guild_id: GuildId,
        reason: String,
    },

    #[error("Mutation {operation} failed for guild {guild_id}: {reason}")]
    MutationFailed {
        operation: &'static str,
        guild_id: GuildId,
        reason: String,
    },

    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Tracing initialisation failed: {reason}")]
    TracingInit { reason: String },
}

/// Message templating errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Embed template is not valid JSON after substitution: {reason}")]
    InvalidEmbed { reason: String },

    #[error("Render failed: {reason}")]
    RenderFailed { reason: String },
}

/// Failures reported by external collaborators (role management, messaging).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Granting role {role_id} failed: {reason}")]
    GrantFailed { role_id: RoleId, reason: String },

    #[error("Revoking role {role_id} failed: {reason}")]
    RevokeFailed { role_id: RoleId, reason: String },

    #[error("Sending to channel {channel_id} failed: {reason}")]
    SendFailed { channel_id: ChannelId, reason: String },

    #[error("Adding reaction in channel {channel_id} failed: {reason}")]
    ReactionFailed { channel_id: ChannelId, reason: String },

    #[error("Guild {guild_id} is unavailable: {reason}")]
    GuildUnavailable { guild_id: GuildId, reason: String },
}

/// Master error type for all invitetrack errors.
#[derive(Debug, Clone, Error)]
pub enum InviteError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Result type alias for invitetrack operations.
pub type InviteResult<T> = Result<T, InviteError>;

// =============================================================================
// TESTS
// =============================================================================
