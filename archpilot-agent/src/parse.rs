//! Extraction of structured payloads from model replies.
//!
//! Generation models wrap JSON in markdown fences, prepend prose, or leave
//! trailing commas. Replies are cleaned before deserialization so that a
//! cosmetic defect does not burn a refinement attempt.

use archpilot_core::{ArchError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

static TRAILING_COMMA_REGEX: OnceLock<Regex> = OnceLock::new();

fn trailing_comma_regex() -> &'static Regex {
    TRAILING_COMMA_REGEX.get_or_init(|| Regex::new(r",\s*([}\]])").expect("Invalid regex pattern"))
}

/// Cuts the reply down to the first top-level JSON object and removes the
/// decorations models commonly add around it.
pub fn clean_json_reply(reply: &str) -> Result<String> {
    let mut text = reply.trim();

    if let Some(fence_start) = text.find("```") {
        let after_fence = &text[fence_start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        text = match body.find("```") {
            Some(fence_end) => body[..fence_end].trim(),
            None => body.trim(),
        };
    }

    let start = text
        .find('{')
        .ok_or_else(|| ArchError::Agent(format!("no JSON object in model reply: {text:.80}")))?;
    let end = text
        .rfind('}')
        .filter(|&end| end >= start)
        .ok_or_else(|| ArchError::Agent("unterminated JSON object in model reply".to_string()))?;

    let cleaned = trailing_comma_regex().replace_all(&text[start..=end], "$1");
    Ok(cleaned.into_owned())
}

/// Cleans the reply and deserializes it into the agent's payload type.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let cleaned = clean_json_reply(reply)?;
    serde_json::from_str(&cleaned)
        .map_err(|e| ArchError::Agent(format!("model reply failed to deserialize: {e}")))
}
