//! Tolerant JSON extraction: pulls one JSON object out of free-form model output.
//!
//! Candidate selection, in order:
//! 1. a ```` ```json ```` fenced block whose body is `{ ... }`;
//! 2. the span from the first `{` to the last `}`;
//! 3. the whole text.
//!
//! The candidate is then parsed strictly. Nothing is repaired. Step 2 is
//! positional and does not balance braces, so prose containing stray braces
//! around the payload can produce an invalid candidate.

use serde_json::{Map, Value};
use thiserror::Error;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model output parsed as JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Extracts and strictly parses the JSON object embedded in `raw`.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    let candidate = fenced_object(raw)
        .or_else(|| outer_braces(raw))
        .unwrap_or(raw);

    match serde_json::from_str::<Value>(candidate)? {
        Value::Object(object) => Ok(object),
        Value::Array(_) => Err(ExtractionError::NotAnObject("array")),
        Value::String(_) => Err(ExtractionError::NotAnObject("string")),
        Value::Number(_) => Err(ExtractionError::NotAnObject("number")),
        Value::Bool(_) => Err(ExtractionError::NotAnObject("boolean")),
        Value::Null => Err(ExtractionError::NotAnObject("null")),
    }
}

/// First ```` ```json ```` fence whose body starts with `{` and whose closing
/// fence is preceded (modulo whitespace) by `}`. The shortest such body wins.
fn fenced_object(raw: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(pos) = raw[search_from..].find(JSON_FENCE) {
        let body_start = search_from + pos + JSON_FENCE.len();
        let body = raw[body_start..].trim_start();
        if body.starts_with('{') {
            let mut fence_from = 1;
            while let Some(fence) = body[fence_from..].find(FENCE) {
                let before = body[..fence_from + fence].trim_end();
                if before.len() > 1 && before.ends_with('}') {
                    return Some(before);
                }
                fence_from += fence + FENCE.len();
            }
        }
        search_from = body_start;
    }
    None
}

/// Span from the first `{` through the last `}`, if the last follows the first.
fn outer_braces(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
