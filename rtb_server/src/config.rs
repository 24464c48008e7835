//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use ride_the_bus::LobbyConfig;
use std::{fmt, net::SocketAddr, str::FromStr};

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus exporter bind address, disabled when absent
    pub metrics_bind: Option<SocketAddr>,
    /// Timers and limits every lobby is created with
    pub lobby: LobbyConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `metrics_override` - Optional metrics bind address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if any variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        metrics_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or("SERVER_BIND", SocketAddr::from(DEFAULT_BIND))?,
        };

        let metrics_bind = match metrics_override {
            Some(addr) => Some(addr),
            None => parse_env("METRICS_BIND")?,
        };

        let defaults = LobbyConfig::default();
        let lobby = LobbyConfig {
            round_duration_secs: parse_env_or("ROUND_DURATION_SECS", defaults.round_duration_secs)?,
            distribution_duration_secs: parse_env_or(
                "DISTRIBUTION_DURATION_SECS",
                defaults.distribution_duration_secs,
            )?,
            idle_close_after_secs: parse_env_or(
                "IDLE_CLOSE_AFTER_SECS",
                defaults.idle_close_after_secs,
            )?,
            shutdown_grace_secs: parse_env_or(
                "SHUTDOWN_GRACE_SECS",
                defaults.shutdown_grace_secs,
            )?,
            ..defaults
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            lobby,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lobby.round_duration_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "ROUND_DURATION_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.lobby.distribution_duration_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "DISTRIBUTION_DURATION_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.lobby.idle_close_after_secs < self.lobby.round_duration_secs {
            return Err(ConfigError::Invalid {
                var: "IDLE_CLOSE_AFTER_SECS".to_string(),
                reason: format!(
                    "Must be at least the round duration ({})",
                    self.lobby.round_duration_secs
                ),
            });
        }

        if let Some(metrics) = self.metrics_bind
            && metrics == self.bind
        {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        self.lobby
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "lobby".to_string(),
                reason,
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a raw variable value. Unset or blank means `None`; anything else
/// must parse.
fn parse_value<T>(key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => {
            value
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: format!("{e} (got {value:?})"),
                })
        }
        _ => Ok(None),
    }
}

/// Helper to parse an optional environment variable
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    parse_value(key, std::env::var(key).ok())
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    Ok(parse_env(key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            metrics_bind: None,
            lobby: LobbyConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "SERVER_BIND".to_string(),
            reason: "invalid socket address syntax".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SERVER_BIND"));
        assert!(msg.contains("invalid socket address"));
    }

    #[test]
    fn test_default_bind() {
        let bind = SocketAddr::from(DEFAULT_BIND);
        assert_eq!(bind.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_parse_value_unset_or_blank() {
        assert_eq!(parse_value::<u64>("ROUND_DURATION_SECS", None).unwrap(), None);
        assert_eq!(
            parse_value::<u64>("ROUND_DURATION_SECS", Some("  ".to_string())).unwrap(),
            None
        );
    }

    #[test]
    fn test_parse_value_trims() {
        assert_eq!(
            parse_value::<u64>("ROUND_DURATION_SECS", Some(" 30 ".to_string())).unwrap(),
            Some(30)
        );
    }

    #[test]
    fn test_parse_value_garbage_fails_loudly() {
        let err = parse_value::<u64>("ROUND_DURATION_SECS", Some("abc".to_string())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ROUND_DURATION_SECS"));
        assert!(msg.contains("\"abc\""));

        let err = parse_value::<SocketAddr>("METRICS_BIND", Some("nope".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "METRICS_BIND"));
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_round_duration_zero() {
        let mut config = config();
        config.lobby.round_duration_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "ROUND_DURATION_SECS"));
    }

    #[test]
    fn test_config_validation_idle_shorter_than_round() {
        let mut config = config();
        config.lobby.idle_close_after_secs = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_metrics_clash() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);
        assert!(config.validate().is_err());
    }
}
