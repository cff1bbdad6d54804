//! Engine configuration
//!
//! Configuration is loaded from environment variables with defaults that suit
//! the shared public bot.

use crate::{BotType, ConfigError};

/// Default reaction added to posted rank announcements.
pub const DEFAULT_ANNOUNCEMENT_REACTION: &str = "🎉";

/// Default number of custom invite records listed in a member report.
pub const DEFAULT_CUSTOM_INVITE_HISTORY: usize = 10;

/// Process-wide engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Custom bots always have premium.
    pub bot_type: BotType,
    /// Reaction added to rank announcements after they are posted.
    pub announcement_reaction: String,
    /// Custom invite records listed in a member report before the rest are summarised.
    pub custom_invite_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bot_type: BotType::Regular,
            announcement_reaction: DEFAULT_ANNOUNCEMENT_REACTION.to_string(),
            custom_invite_history: DEFAULT_CUSTOM_INVITE_HISTORY,
        }
    }
}

impl EngineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create EngineConfig from environment variables.
    ///
    /// Environment variables:
    /// - `INVITETRACK_BOT_TYPE`: "regular" or "custom" (default: regular)
    /// - `INVITETRACK_ANNOUNCEMENT_REACTION`: reaction for announcements (default: 🎉)
    /// - `INVITETRACK_CUSTOM_INVITE_HISTORY`: member report history length (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("INVITETRACK_BOT_TYPE") {
            config.bot_type = BotType::from_db_str(&raw).map_err(|e| ConfigError::InvalidValue {
                field: "INVITETRACK_BOT_TYPE".to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Ok(reaction) = std::env::var("INVITETRACK_ANNOUNCEMENT_REACTION") {
            config.announcement_reaction = reaction;
        }

        if let Ok(raw) = std::env::var("INVITETRACK_CUSTOM_INVITE_HISTORY") {
            config.custom_invite_history =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "INVITETRACK_CUSTOM_INVITE_HISTORY".to_string(),
                    value: raw.clone(),
                    reason: "must be a non-negative integer".to_string(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the bot type.
    pub fn with_bot_type(mut self, bot_type: BotType) -> Self {
        self.bot_type = bot_type;
        self
    }

    /// Set the announcement reaction.
    pub fn with_announcement_reaction(mut self, reaction: impl Into<String>) -> Self {
        self.announcement_reaction = reaction.into();
        self
    }

    /// Set the member report history length.
    pub fn with_custom_invite_history(mut self, limit: usize) -> Self {
        self.custom_invite_history = limit;
        self
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.announcement_reaction.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "announcement_reaction".to_string(),
                value: self.announcement_reaction.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.custom_invite_history == 0 {
            return Err(ConfigError::InvalidValue {
                field: "custom_invite_history".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.announcement_reaction, "🎉");
        assert_eq!(config.bot_type, BotType::Regular);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_bot_type(BotType::Custom)
            .with_announcement_reaction("👏")
            .with_custom_invite_history(25);
        assert_eq!(config.bot_type, BotType::Custom);
        assert_eq!(config.announcement_reaction, "👏");
        assert_eq!(config.custom_invite_history, 25);
    }

    #[test]
    fn test_validate_rejects_empty_reaction_and_zero_history() {
        assert!(EngineConfig::new()
            .with_announcement_reaction("  ")
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_custom_invite_history(0)
            .validate()
            .is_err());
    }
}
