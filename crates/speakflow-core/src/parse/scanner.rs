//! Best-effort field scanning over partially arrived JSON text
//!
//! Reads quoted string values out of a document that may be cut off anywhere,
//! including mid-key or mid-value. "Not there yet" and "not there" look the
//! same on purpose; callers retry on the next chunk.

use crate::generation::types::ScriptMetadata;

/// Candidate spellings per logical metadata field; first non-blank hit wins.
const TOPIC_KEYS: &[&str] = &["topic", "topic_title", "topicTitle"];
const OPPONENT_NAME_KEYS: &[&str] = &["opponent_name", "opponentName"];
const OPPONENT_GENDER_KEYS: &[&str] = &["opponent_gender", "opponentGender"];

/// Gender used when the document never states one.
pub const DEFAULT_OPPONENT_GENDER: &str = "female";

/// Read the string value for `key` out of possibly incomplete JSON text.
///
/// Escape handling is deliberately simplified: any `\X` pair collapses to
/// `X`, so `\uXXXX` sequences are not decoded and come back as `uXXXX`.
/// Only quoted string values are supported on this path; a non-string value
/// reads as not-found. An unterminated value also reads as not-found until
/// its closing quote arrives.
pub fn read_string_value(source: &str, key: &str) -> Option<String> {
    let quoted_key = format!("\"{key}\"");
    let key_index = source.find(&quoted_key)?;
    let after_key = key_index + quoted_key.len();
    let colon = source[after_key..].find(':')? + after_key;

    let mut value_start = None;
    for (offset, ch) in source[colon + 1..].char_indices() {
        if ch.is_whitespace() {
            continue;
        }
        if ch != '"' {
            return None;
        }
        value_start = Some(colon + 1 + offset + 1);
        break;
    }
    let value_start = value_start?;

    let mut value = String::new();
    let mut escaping = false;
    for ch in source[value_start..].chars() {
        if escaping {
            value.push(ch);
            escaping = false;
            continue;
        }
        match ch {
            '\\' => escaping = true,
            '"' => return Some(value),
            _ => value.push(ch),
        }
    }
    None
}

/// Derive dialogue metadata from the whole accumulated buffer.
///
/// Topic and opponent name must both be present and non-blank (directly or
/// via `previous`) before anything is returned; gender is normalized and
/// falls back to the previous value, then [`DEFAULT_OPPONENT_GENDER`].
pub fn scan_metadata(source: &str, previous: Option<&ScriptMetadata>) -> Option<ScriptMetadata> {
    let topic = first_non_blank_value(source, TOPIC_KEYS)
        .or_else(|| previous.and_then(|m| trim_to_non_blank(&m.topic)));
    let opponent_name = first_non_blank_value(source, OPPONENT_NAME_KEYS)
        .or_else(|| previous.and_then(|m| trim_to_non_blank(&m.opponent_name)));
    let (topic, opponent_name) = match (topic, opponent_name) {
        (Some(topic), Some(opponent_name)) => (topic, opponent_name),
        _ => return None,
    };

    let opponent_gender = first_non_blank_value(source, OPPONENT_GENDER_KEYS)
        .and_then(|raw| normalize_gender(&raw))
        .or_else(|| previous.map(|m| m.opponent_gender.clone()))
        .unwrap_or_else(|| DEFAULT_OPPONENT_GENDER.to_string());

    Some(ScriptMetadata {
        topic,
        opponent_name,
        opponent_gender,
    })
}

/// Collapse a gender-like value to one of the two canonical tokens.
/// Anything else is discarded so the caller's fallback chain applies.
fn normalize_gender(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "male" | "female" => Some(lowered),
        _ => None,
    }
}

fn first_non_blank_value(source: &str, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| read_string_value(source, key).as_deref().and_then(trim_to_non_blank))
}

fn trim_to_non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
