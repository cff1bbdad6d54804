//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an env filter and either a
//! human readable or a JSON formatting layer.

use invitetrack_core::ConfigError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `INVITETRACK_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "invitetrack_engine=info,invitetrack_storage=info,warn";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives
    pub filter: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Read `INVITETRACK_LOG` and `INVITETRACK_LOG_JSON`.
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var("INVITETRACK_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            json: std::env::var("INVITETRACK_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
        }
    }
}

/// Install the global subscriber. Fails if the filter does not parse or a
/// subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_new(&config.filter).map_err(|e| ConfigError::InvalidValue {
        field: "INVITETRACK_LOG".to_string(),
        value: config.filter.clone(),
        reason: e.to_string(),
    })?;

    let json_layer = config.json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!config.json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| ConfigError::TracingInit {
            reason: e.to_string(),
        })?;

    tracing::info!(filter = %config.filter, json = config.json, "Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_from_env() {
        let _log = EnvVarGuard::set("INVITETRACK_LOG", Some("debug"));
        let _json = EnvVarGuard::set("INVITETRACK_LOG_JSON", Some("1"));
        let config = TelemetryConfig::from_env();
        assert_eq!(config.filter, "debug");
        assert!(config.json);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = TelemetryConfig {
            filter: "invitetrack_engine=notalevel".to_string(),
            json: false,
        };
        assert!(matches!(
            init_tracing(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig::default();
        let _ = init_tracing(&config);
        assert!(matches!(
            init_tracing(&config),
            Err(ConfigError::TracingInit { .. })
        ));
    }
}
