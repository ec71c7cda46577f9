//! Result of one analysis procedure invocation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What a dispatch produced for one intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisReport {
    /// Free text: a conversational reply, a validation message or an error marker
    PlainText(String),
    /// A procedure payload, optionally with a written report body
    Structured {
        body: Option<String>,
        data: Value,
    },
}

impl AnalysisReport {
    /// Plain-text report
    pub fn text(text: impl Into<String>) -> Self {
        Self::PlainText(text.into())
    }

    /// Error-marker text for a failure caught at the procedure boundary
    pub fn error(cause: impl fmt::Display) -> Self {
        Self::PlainText(format!("Error: {cause}"))
    }

    /// Whether this is free text rather than a structured payload
    pub fn is_text(&self) -> bool {
        matches!(self, Self::PlainText(_))
    }

    /// The text that goes into the aggregated document
    ///
    /// A structured report contributes its body when it has one and its
    /// data serialized otherwise.
    pub fn as_document_text(&self) -> String {
        match self {
            Self::PlainText(text) => text.clone(),
            Self::Structured { body: Some(body), .. } => body.clone(),
            Self::Structured { body: None, data } => {
                serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
            }
        }
    }

    /// Consuming form of [`as_document_text`](Self::as_document_text)
    pub fn into_document_text(self) -> String {
        match self {
            Self::PlainText(text) | Self::Structured { body: Some(text), .. } => text,
            other => other.as_document_text(),
        }
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_document_text())
    }
}
