//! Heuristic failure detection for dispatch results
//!
//! This is a best-effort textual scan, not a reliable contract. Procedures do
//! not return structured error codes here, so any text that contains one of
//! [`ERROR_MARKERS`] is treated as a failure. That includes genuine reports
//! which happen to mention "error" or "missing" in passing; such reports are
//! dropped from aggregation. Structured payloads are never failures.

use crate::report::AnalysisReport;

/// Lowercase substrings that mark a text result as a failure
pub const ERROR_MARKERS: [&str; 7] = [
    "couldn't understand",
    "please specify the stock ticker",
    "sorry",
    "error",
    "not found",
    "no data available",
    "missing",
];

/// Decides whether a dispatch result is a user-facing failure
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureClassifier;

impl FailureClassifier {
    /// Whether the report should be excluded from aggregation
    pub fn is_error_message(report: &AnalysisReport) -> bool {
        match report {
            AnalysisReport::PlainText(text) => Self::is_error_text(text),
            AnalysisReport::Structured { .. } => false,
        }
    }

    /// Marker scan over free text, case-insensitive
    pub fn is_error_text(text: &str) -> bool {
        let lowered = text.to_lowercase();
        ERROR_MARKERS.iter().any(|marker| lowered.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages;
    use serde_json::json;

    #[test]
    fn test_no_data_is_error() {
        let report = AnalysisReport::text("No data available for symbol.");
        assert!(FailureClassifier::is_error_message(&report));
    }

    #[test]
    fn test_structured_is_never_error() {
        let report = AnalysisReport::Structured {
            body: None,
            data: json!({"Current_Price": 123}),
        };
        assert!(!FailureClassifier::is_error_message(&report));

        let with_error_word = AnalysisReport::Structured {
            body: Some("Tracking error is low.".to_string()),
            data: json!({}),
        };
        assert!(!FailureClassifier::is_error_message(&with_error_word));
    }

    #[test]
    fn test_fixed_messages_are_errors() {
        for text in [
            messages::TICKER_NOT_FOUND,
            messages::TICKER_MISSING,
            messages::MACRO_NOT_FOUND,
            messages::NOT_UNDERSTOOD,
            "Error: connection reset",
        ] {
            assert!(FailureClassifier::is_error_text(text), "{text}");
        }
    }

    #[test]
    fn test_marker_match_ignores_case() {
        assert!(FailureClassifier::is_error_text("SORRY, try later"));
        assert!(FailureClassifier::is_error_text("Symbol NOT FOUND"));
    }

    #[test]
    fn test_genuine_report_with_marker_word_is_dropped() {
        // Over-broad on purpose: a legitimate report mentioning "error" still matches.
        let report = AnalysisReport::text("Risk: forecast error may be large. RSI is 55.");
        assert!(FailureClassifier::is_error_message(&report));
    }

    #[test]
    fn test_clean_text_is_not_error() {
        assert!(!FailureClassifier::is_error_text(
            "Apple shows strong margins and moderate valuation."
        ));
    }
}
