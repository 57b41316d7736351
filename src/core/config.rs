// Configuration Management for EDDN Relay
// Environment-driven, with documented defaults for every knob

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

// ============================================================================
// Configuration Structures
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// ZeroMQ endpoint the relay subscribes to.
    pub endpoint: String,
    /// Reconnect if the feed is silent this long; the feed never closes
    /// connections explicitly, silence is the only dead-link signal.
    pub read_timeout_secs: u64,
    /// Cap for the exponential reconnect backoff.
    pub max_backoff_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: "tcp://eddn.edcd.io:9500".to_string(),
            read_timeout_secs: 60,
            max_backoff_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path; `:memory:` keeps everything in-process.
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    pub cors_origin: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            json: true,
        }
    }
}

// ============================================================================
// Relay Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    pub feed: FeedConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Build a configuration from environment variables, starting from the
    /// defaults. Unset variables keep their default; set-but-unparseable
    /// variables are an error (a typo'd port should stop startup, not be
    /// silently replaced).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("EDDN_SOURCE_URL") {
            config.feed.endpoint = value;
        }
        if let Ok(value) = std::env::var("EDDN_READ_TIMEOUT_SECS") {
            config.feed.read_timeout_secs = value.parse().map_err(|_| {
                ConfigError::InvalidValue {
                    key: "EDDN_READ_TIMEOUT_SECS",
                    value,
                }
            })?;
        }
        if let Ok(value) = std::env::var("HTTP_PORT") {
            config.http.port = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HTTP_PORT",
                value,
            })?;
        }
        if let Ok(value) = std::env::var("CORS_ORIGIN") {
            config.http.cors_origin = value;
        }
        if let Ok(value) = std::env::var("DB_FILE_PATH") {
            config.store.db_path = value;
        }
        if let Ok(value) = std::env::var("LOG_LEVEL") {
            config.logging.level = value;
        }
        if let Ok(value) = std::env::var("LOG_JSON") {
            config.logging.json = value.to_lowercase() == "true";
        }

        Ok(config)
    }

    /// Validate configuration, logging every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !self.feed.endpoint.starts_with("tcp://") {
            errors.push(format!(
                "feed endpoint must be a tcp:// ZeroMQ address, got {:?}",
                self.feed.endpoint
            ));
        }
        if self.feed.read_timeout_secs == 0 {
            errors.push("read_timeout_secs must be greater than zero".to_string());
        }
        if self.http.port == 0 {
            errors.push("http port must be greater than zero".to_string());
        }
        if self.http.cors_origin.is_empty() {
            errors.push("cors_origin must not be empty".to_string());
        }
        if self.store.db_path.is_empty() {
            errors.push("db_path must not be empty".to_string());
        }

        if !errors.is_empty() {
            for error in &errors {
                warn!(error = %error, "Config validation error");
            }
            return Err(ConfigError::Validation(errors.join("; ")));
        }

        Ok(())
    }

    /// Get configuration summary
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            endpoint: self.feed.endpoint.clone(),
            http_port: self.http.port,
            db_path: self.store.db_path.clone(),
            cors_origin: self.http.cors_origin.clone(),
            log_level: self.logging.level.clone(),
        }
    }
}

// ============================================================================
// Configuration Summary
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub endpoint: String,
    pub http_port: u16,
    pub db_path: String,
    pub cors_origin: String,
    pub log_level: String,
}

impl fmt::Display for ConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "endpoint={}, http_port={}, db={}, cors={}, log={}",
            self.endpoint, self.http_port, self.db_path, self.cors_origin, self.log_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.feed.endpoint, "tcp://eddn.edcd.io:9500");
        assert_eq!(config.feed.read_timeout_secs, 60);
        assert_eq!(config.http.port, 3001);
        assert_eq!(config.http.cors_origin, "http://localhost:5173");
        assert_eq!(config.store.db_path, ":memory:");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_default_config_validates() {
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = RelayConfig::default();
        config.feed.endpoint = "wss://example.com".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("tcp://"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = RelayConfig::default();
        config.http.port = 0;
        config.store.db_path = String::new();
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("http port"));
        assert!(message.contains("db_path"));
    }

    #[test]
    fn test_config_summary() {
        let summary = RelayConfig::default().summary();
        assert_eq!(summary.http_port, 3001);
        assert_eq!(summary.endpoint, "tcp://eddn.edcd.io:9500");
        assert!(format!("{}", summary).contains("http_port=3001"));
    }
}
