//! Parser for the intent classifier's JSON reply
//!
//! Accepted shapes:
//!
//! - `{"intent": "...", "entities": {...}}` becomes a one-element batch
//! - `{"intents": [{"intent": ..., "entities": ...}, ...]}` is used as is
//!
//! Everything else is an [`IntentParseError`]. A reply wrapped in a
//! Markdown code fence is unwrapped first.

use super::{ClassifiedIntent, IntentBatch};
use crate::error::IntentParseError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").ok());

/// Parse raw classifier output into a non-empty intent batch
pub fn parse_intent_output(raw: &str) -> Result<IntentBatch, IntentParseError> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| IntentParseError::InvalidJson(e.to_string()))?;

    let Value::Object(object) = value else {
        return Err(IntentParseError::UnrecognizedShape);
    };

    if let Some(intents) = object.get("intents") {
        let Value::Array(items) = intents else {
            return Err(IntentParseError::UnrecognizedShape);
        };
        let intents = items
            .iter()
            .map(|item| match item {
                Value::Object(entry) => parse_entry(entry),
                _ => Err(IntentParseError::UnrecognizedShape),
            })
            .collect::<Result<Vec<_>, _>>()?;
        return IntentBatch::multi(intents);
    }

    if object.contains_key("intent") || object.contains_key("entities") {
        return parse_entry(&object).map(IntentBatch::single);
    }

    Err(IntentParseError::UnrecognizedShape)
}

fn parse_entry(entry: &Map<String, Value>) -> Result<ClassifiedIntent, IntentParseError> {
    let intent = entry
        .get("intent")
        .and_then(Value::as_str)
        .ok_or(IntentParseError::MissingKey("intent"))?;

    let entities = match entry.get("entities") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) => Map::new(),
        Some(_) => return Err(IntentParseError::UnrecognizedShape),
        None => return Err(IntentParseError::MissingKey("entities")),
    };

    Ok(ClassifiedIntent::with_fallback_period(
        intent,
        entities,
        entry.get("period"),
    ))
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .as_ref()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
}
