//! Error types for the finance assistant core

use thiserror::Error;

/// Failures while turning classifier output into an [`IntentBatch`]
///
/// [`IntentBatch`]: crate::intent::IntentBatch
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentParseError {
    /// The text is not valid JSON
    #[error("classifier output is not valid JSON: {0}")]
    InvalidJson(String),

    /// A required key is absent or has the wrong type
    #[error("classifier output is missing required key '{0}'")]
    MissingKey(&'static str),

    /// `intents` was present but empty
    #[error("classifier returned an empty intents list")]
    EmptyBatch,

    /// Valid JSON, but neither of the accepted shapes
    #[error("classifier output has an unrecognized shape")]
    UnrecognizedShape,
}

/// Finance core errors
#[derive(Debug, Error)]
pub enum FinanceError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol or series
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Unknown history period
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Input could not be resolved to a country
    #[error("Could not resolve country from input: {0}")]
    UnresolvedCountry(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Prompt template rendering error
    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// Completion service error
    #[error("Language model error: {0}")]
    LlmError(#[from] agent_llm::LLMError),

    /// Classifier output did not match the intent contract
    #[error(transparent)]
    IntentParse(#[from] IntentParseError),

    /// Report file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for finance operations
pub type Result<T> = std::result::Result<T, FinanceError>;
