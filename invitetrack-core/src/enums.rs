//! Enum types for invitetrack entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// JOIN INVALIDATION
// ============================================================================

/// Why a join stopped counting for its inviter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinInvalidatedReason {
    /// The joined account was judged fake.
    Fake,
    /// The joined member left the guild again.
    Leave,
}

impl JoinInvalidatedReason {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            JoinInvalidatedReason::Fake => "fake",
            JoinInvalidatedReason::Leave => "leave",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.to_lowercase().as_str() {
            "fake" => Ok(JoinInvalidatedReason::Fake),
            "leave" => Ok(JoinInvalidatedReason::Leave),
            _ => Err(EnumParseError::new("join invalidated reason", s)),
        }
    }
}

impl fmt::Display for JoinInvalidatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for JoinInvalidatedReason {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// RANK ASSIGNMENT
// ============================================================================

/// How rank roles are handed out once a member qualifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RankAssignmentStyle {
    /// Every reached rank role is granted.
    #[default]
    All,
    /// Only the highest reached rank role is kept.
    Highest,
}

impl RankAssignmentStyle {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RankAssignmentStyle::All => "all",
            RankAssignmentStyle::Highest => "highest",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.to_lowercase().as_str() {
            "all" => Ok(RankAssignmentStyle::All),
            "highest" => Ok(RankAssignmentStyle::Highest),
            _ => Err(EnumParseError::new("rank assignment style", s)),
        }
    }
}

impl fmt::Display for RankAssignmentStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for RankAssignmentStyle {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// CUSTOM INVITES
// ============================================================================

/// Marks custom invite rows written by the system rather than by a moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomInviteGeneratedReason {
    /// Written by a clear-invites operation.
    ClearInvites,
    /// Written when fake joins were converted into a debit.
    Fake,
}

// ============================================================================
// BOT FLAVOUR
// ============================================================================

/// Which deployment the engine runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BotType {
    /// The shared public bot.
    #[default]
    Regular,
    /// A privately hosted bot; always premium.
    Custom,
}

impl BotType {
    /// Parse from configuration text.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(BotType::Regular),
            "custom" => Ok(BotType::Custom),
            _ => Err(EnumParseError::new("bot type", s)),
        }
    }
}

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}
