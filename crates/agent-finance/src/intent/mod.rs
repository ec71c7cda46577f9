//! Classified intents and their normalized entities
//!
//! The classifier returns a loosely keyed entity bag. It is normalized
//! exactly once, when a [`ClassifiedIntent`] is built, into
//! [`IntentEntities`]; nothing downstream looks at the raw aliases again.

mod parser;

pub use parser::parse_intent_output;

use crate::error::IntentParseError;
use serde_json::{Map, Value};
use std::fmt;

/// Entity keys that may carry the ticker, in priority order
pub const TICKER_ALIASES: [&str; 6] = [
    "company_ticker",
    "ticker",
    "ticker_symbol",
    "company",
    "stock",
    "stock_symbol",
];

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentKind {
    FundamentalAnalysis,
    TechnicalAnalysis,
    MacroOutlook,
    Conversation,
    /// Anything outside the supported vocabulary, kept verbatim
    Unsupported(String),
}

impl IntentKind {
    /// Parse an intent name; matching ignores case and surrounding whitespace
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "fundamental_analysis" => Self::FundamentalAnalysis,
            "technical_analysis" => Self::TechnicalAnalysis,
            "macro_outlook" => Self::MacroOutlook,
            "conversation" => Self::Conversation,
            _ => Self::Unsupported(raw.to_string()),
        }
    }

    /// Whether the aggregator should dispatch this intent at all
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Canonical wire name
    pub fn as_str(&self) -> &str {
        match self {
            Self::FundamentalAnalysis => "fundamental_analysis",
            Self::TechnicalAnalysis => "technical_analysis",
            Self::MacroOutlook => "macro_outlook",
            Self::Conversation => "conversation",
            Self::Unsupported(raw) => raw,
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of the entity bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentEntities {
    /// First non-empty ticker alias, trimmed
    pub ticker: Option<String>,
    /// Country name, trimmed
    pub country: Option<String>,
    /// Technical-analysis period (e.g. `3mo`)
    pub period: Option<String>,
    /// Range start, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Range end, `YYYY-MM-DD`
    pub end_date: Option<String>,
}

impl IntentEntities {
    /// Normalize a raw entity bag
    ///
    /// `fallback_period` is a top-level `period` some classifier replies put
    /// next to `entities` instead of inside it.
    pub fn normalize(raw: &Map<String, Value>, fallback_period: Option<&Value>) -> Self {
        let ticker = TICKER_ALIASES
            .iter()
            .find_map(|key| raw.get(*key).and_then(entity_text));

        Self {
            ticker,
            country: raw.get("country").and_then(entity_text),
            period: raw
                .get("period")
                .and_then(entity_text)
                .or_else(|| fallback_period.and_then(entity_text)),
            start_date: raw.get("start_date").and_then(entity_text),
            end_date: raw.get("end_date").and_then(entity_text),
        }
    }

    /// Both ends of an explicit date range, when both are present
    pub fn date_range(&self) -> Option<(&str, &str)> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => Some((start.as_str(), end.as_str())),
            _ => None,
        }
    }
}

/// Flatten one entity value into trimmed text
///
/// Objects are read through their `description` field. Null, empty strings,
/// arrays and objects without a usable description yield `None`.
pub fn entity_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => return map.get("description").and_then(entity_text),
        Value::Null | Value::Array(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// One parsed unit of user intent
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedIntent {
    /// Intent kind
    pub kind: IntentKind,
    /// Entity bag as the classifier produced it
    pub raw_entities: Map<String, Value>,
    /// Normalized entities
    pub entities: IntentEntities,
}

impl ClassifiedIntent {
    /// Build an intent, normalizing its entities
    pub fn new(intent: &str, raw_entities: Map<String, Value>) -> Self {
        Self::with_fallback_period(intent, raw_entities, None)
    }

    /// Build an intent that may carry a top-level `period`
    pub fn with_fallback_period(
        intent: &str,
        raw_entities: Map<String, Value>,
        fallback_period: Option<&Value>,
    ) -> Self {
        let entities = IntentEntities::normalize(&raw_entities, fallback_period);
        Self {
            kind: IntentKind::parse(intent),
            raw_entities,
            entities,
        }
    }
}

/// Which classifier reply shape a batch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchShape {
    /// `{intent, entities}`
    Single,
    /// `{intents: [...]}`
    Multi,
}

/// Non-empty, ordered output of one classification call
#[derive(Debug, Clone, PartialEq)]
pub struct IntentBatch {
    shape: BatchShape,
    intents: Vec<ClassifiedIntent>,
}

impl IntentBatch {
    /// Wrap a single intent
    pub fn single(intent: ClassifiedIntent) -> Self {
        Self {
            shape: BatchShape::Single,
            intents: vec![intent],
        }
    }

    /// Build a multi-intent batch; empty input is rejected
    pub fn multi(intents: Vec<ClassifiedIntent>) -> Result<Self, IntentParseError> {
        if intents.is_empty() {
            return Err(IntentParseError::EmptyBatch);
        }
        Ok(Self {
            shape: BatchShape::Multi,
            intents,
        })
    }

    /// Reply shape the batch was parsed from
    pub fn shape(&self) -> BatchShape {
        self.shape
    }

    /// Intents in classifier order
    pub fn iter(&self) -> std::slice::Iter<'_, ClassifiedIntent> {
        self.intents.iter()
    }

    /// Number of intents (always at least one)
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The intent retained as the session's active intent
    pub fn last(&self) -> &ClassifiedIntent {
        // Constructors guarantee at least one element.
        &self.intents[self.intents.len() - 1]
    }
}

impl<'a> IntoIterator for &'a IntentBatch {
    type Item = &'a ClassifiedIntent;
    type IntoIter = std::slice::Iter<'a, ClassifiedIntent>;

    fn into_iter(self) -> Self::IntoIter {
        self.intents.iter()
    }
}
