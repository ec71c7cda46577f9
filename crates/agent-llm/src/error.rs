//! Completion service errors

use thiserror::Error;

/// Result type for completion calls
pub type Result<T> = std::result::Result<T, LLMError>;

/// Failures talking to a completion service
#[derive(Error, Debug)]
pub enum LLMError {
    /// The service answered with an unclassified failure status
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The service rejected the request body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Transport failure, including timeouts
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// A success status with a body we could not use
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Missing or malformed provider settings
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, model: &str, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed,
            429 => Self::RateLimitExceeded(body),
            400 | 422 => Self::InvalidRequest(body),
            404 => Self::ModelNotFound(model.to_string()),
            _ => Self::RequestFailed(format!("HTTP {status}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            LLMError::from_status(401, "gpt-3.5-turbo", String::new()),
            LLMError::AuthenticationFailed
        ));
        assert!(matches!(
            LLMError::from_status(404, "qwen2.5-7b", "no such model".into()),
            LLMError::ModelNotFound(model) if model == "qwen2.5-7b"
        ));

        let err = LLMError::from_status(503, "gpt-3.5-turbo", "overloaded".into());
        assert_eq!(err.to_string(), "API request failed: HTTP 503: overloaded");
    }

    #[test]
    fn test_rate_limit_keeps_body() {
        let err = LLMError::from_status(429, "gpt-3.5-turbo", "slow down".into());
        assert_eq!(err.to_string(), "Rate limit exceeded: slow down");
    }
}
