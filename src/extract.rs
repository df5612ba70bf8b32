//! Recovers a structured JSON payload from the answer service's free-text
//! reply. The service is told to return bare JSON but routinely wraps it in
//! prose or a markdown fence, and sprinkles citation markers through string
//! values.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};

// Compiled once and reused across requests
static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("Failed to compile fence pattern")
});

static NUMERIC_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d+(?:[-,]\d+)*\](?:\[\d+\])?").expect("Failed to compile citation pattern")
});

static NAMED_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[(?:ref|cite|source|[\d\s,\-])+\]").expect("Failed to compile citation pattern")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace pattern"));

static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,!?])").expect("Failed to compile punctuation pattern"));

static SPACE_AFTER_OPEN_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s+").expect("Failed to compile paren pattern"));

static SPACE_BEFORE_CLOSE_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\)").expect("Failed to compile paren pattern"));

/// Recovers one JSON object from the raw upstream text.
///
/// Tries the whole text first, then a fenced block, then the outermost
/// brace-delimited substring. A candidate is only accepted if it actually
/// parses.
pub fn extract_json(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(value);
    }

    // Upstream often fences the object even when told not to, so the fence
    // is checked before the bare brace scan.
    if let Some(caps) = FENCED_JSON.captures(text) {
        if let Ok(value) = serde_json::from_str::<Value>(caps[1].trim()) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AppError::Extraction("no valid JSON found".to_string()))
}

/// Strips citation markers and normalizes spacing in a single string.
/// Idempotent: cleaning a cleaned string is a no-op.
pub fn clean_text(text: &str) -> String {
    let cleaned = NUMERIC_CITATION.replace_all(text, "");
    let cleaned = NAMED_CITATION.replace_all(&cleaned, "");
    let cleaned = WHITESPACE_RUN.replace_all(&cleaned, " ");
    let cleaned = SPACE_BEFORE_PUNCT.replace_all(&cleaned, "$1");
    let cleaned = SPACE_AFTER_OPEN_PAREN.replace_all(&cleaned, "(");
    let cleaned = SPACE_BEFORE_CLOSE_PAREN.replace_all(&cleaned, ")");
    cleaned.trim().to_string()
}

/// Applies [`clean_text`] to every string value in the tree, recursing
/// through objects and arrays. Non-string values pass through untouched.
pub fn clean_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, clean_value(v)))
                .collect(),
        ),
        other => other,
    }
}
