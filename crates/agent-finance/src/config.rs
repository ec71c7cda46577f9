//! Configuration for the finance assistant

use crate::error::{FinanceError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default completion model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Technical-analysis period used when neither a period nor a date range is given
pub const DEFAULT_TECHNICAL_PERIOD: &str = "1y";

/// Configuration for the finance assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceConfig {
    /// Model identifier passed to the completion service
    pub model: String,

    /// Sampling temperature for every agent
    pub temperature: f32,

    /// Maximum tokens per completion
    pub max_tokens: usize,

    /// Idle time after which a session's conversation is cleared
    pub session_idle_timeout: Duration,

    /// Period for technical analysis when the request names none
    pub default_technical_period: String,

    /// Cache TTL for ticker info lookups
    pub info_cache_ttl: Duration,

    /// Request timeout for market data calls
    pub request_timeout: Duration,

    /// Requests per minute allowed against each market data API
    pub rate_limit_per_minute: u32,

    /// EconDB API token (optional, anonymous access is rate limited harder)
    pub econdb_api_token: Option<String>,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            session_idle_timeout: Duration::from_secs(30 * 60),
            default_technical_period: DEFAULT_TECHNICAL_PERIOD.to_string(),
            info_cache_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            rate_limit_per_minute: 60,
            econdb_api_token: None,
        }
    }
}

impl FinanceConfig {
    /// Create a new configuration builder
    pub fn builder() -> FinanceConfigBuilder {
        FinanceConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(FinanceError::ConfigError("model must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(FinanceError::ConfigError(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }

        if self.session_idle_timeout.is_zero() {
            return Err(FinanceError::ConfigError(
                "session_idle_timeout must be greater than 0".to_string(),
            ));
        }

        if self.default_technical_period.trim().is_empty() {
            return Err(FinanceError::ConfigError(
                "default_technical_period must not be empty".to_string(),
            ));
        }

        if self.rate_limit_per_minute == 0 {
            return Err(FinanceError::ConfigError(
                "rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for FinanceConfig
#[derive(Debug, Default)]
pub struct FinanceConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    session_idle_timeout: Option<Duration>,
    default_technical_period: Option<String>,
    info_cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    rate_limit_per_minute: Option<u32>,
    econdb_api_token: Option<String>,
}

impl FinanceConfigBuilder {
    /// Set the completion model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Read the model from `OPENAI_MODEL` if set
    pub fn from_env_model(mut self) -> Self {
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.model = Some(model);
        }
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens per completion
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the session idle timeout
    pub fn session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = Some(timeout);
        self
    }

    /// Set the default technical-analysis period
    pub fn default_technical_period(mut self, period: impl Into<String>) -> Self {
        self.default_technical_period = Some(period.into());
        self
    }

    /// Set cache TTL for ticker info
    pub fn info_cache_ttl(mut self, duration: Duration) -> Self {
        self.info_cache_ttl = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the per-API rate limit
    pub fn rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.rate_limit_per_minute = Some(limit);
        self
    }

    /// Set the EconDB token
    pub fn econdb_api_token(mut self, token: impl Into<String>) -> Self {
        self.econdb_api_token = Some(token.into());
        self
    }

    /// Read the EconDB token from `ECONDB_API_TOKEN` if set
    pub fn with_env_api_keys(mut self) -> Self {
        if let Ok(token) = std::env::var("ECONDB_API_TOKEN") {
            self.econdb_api_token = Some(token);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<FinanceConfig> {
        let defaults = FinanceConfig::default();

        let config = FinanceConfig {
            model: self.model.unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            session_idle_timeout: self
                .session_idle_timeout
                .unwrap_or(defaults.session_idle_timeout),
            default_technical_period: self
                .default_technical_period
                .unwrap_or(defaults.default_technical_period),
            info_cache_ttl: self.info_cache_ttl.unwrap_or(defaults.info_cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            rate_limit_per_minute: self
                .rate_limit_per_minute
                .unwrap_or(defaults.rate_limit_per_minute),
            econdb_api_token: self.econdb_api_token,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FinanceConfig::default();
        assert_eq!(config.session_idle_timeout, Duration::from_secs(1800));
        assert_eq!(config.default_technical_period, "1y");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = FinanceConfig::builder()
            .model("local-model")
            .temperature(0.0)
            .session_idle_timeout(Duration::from_secs(60))
            .econdb_api_token("token")
            .build()
            .unwrap();

        assert_eq!(config.model, "local-model");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(60));
        assert_eq!(config.econdb_api_token.as_deref(), Some("token"));
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(FinanceConfig::builder().model("  ").build().is_err());
        assert!(FinanceConfig::builder().temperature(3.5).build().is_err());
        assert!(
            FinanceConfig::builder()
                .session_idle_timeout(Duration::ZERO)
                .build()
                .is_err()
        );
        assert!(
            FinanceConfig::builder()
                .default_technical_period("")
                .build()
                .is_err()
        );
    }
}
