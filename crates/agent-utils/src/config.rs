//! Application-level configuration

use crate::logging::{DEFAULT_LOG_FILTER, LogFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading application configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Process-wide settings that are not specific to the finance core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
    /// Tracing output format
    pub log_format: LogFormat,
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "finance-agent".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Read overrides from `APP_ENV`, `LOG_FORMAT` and `LOG_FILTER`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(env) = std::env::var("APP_ENV") {
            config.environment = env;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.log_format = format
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: "LOG_FORMAT".to_string(),
                    reason,
                })?;
        }
        if let Ok(filter) = std::env::var("LOG_FILTER") {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.app_name, "finance-agent");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.is_production());
    }

    #[test]
    fn test_from_env_overrides() {
        unsafe {
            std::env::set_var("APP_ENV", "Production");
            std::env::set_var("LOG_FORMAT", "json");
        }

        let config = AppConfig::from_env().unwrap();
        assert!(config.is_production());
        assert_eq!(config.log_format, LogFormat::Json);

        unsafe {
            std::env::set_var("LOG_FORMAT", "yaml");
        }
        assert!(AppConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("APP_ENV");
            std::env::remove_var("LOG_FORMAT");
        }
    }
}
