//! Strict parsing of a complete script document
//!
//! Used when a finished payload is loaded in one piece (history replay,
//! cached scripts) instead of streamed.

use rand::Rng;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::generation::types::{DialogueScript, ScriptTurn};

const DEFAULT_TOPIC: &str = "영어 연습";
const DEFAULT_OPPONENT_NAME: &str = "English Coach";
const DEFAULT_OPPONENT_ROLE: &str = "Partner";

#[derive(Debug, Error)]
pub enum ScriptParseError {
    #[error("invalid script document: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("missing script array")]
    MissingScriptArray,
    #[error("script item {0} is not an object")]
    InvalidTurnObject(usize),
}

/// Full-document parser for a finished generation payload.
///
/// Accepts either an object root carrying metadata plus a `script` array, or
/// a bare array of turns with defaulted metadata.
pub struct DialogueScriptParser {
    fallback_gender: Option<String>,
}

impl DialogueScriptParser {
    pub fn new() -> Self {
        Self {
            fallback_gender: None,
        }
    }

    /// Pin the gender used when the document omits `opponent_gender`; the
    /// default picks randomly between the two canonical tokens.
    pub fn with_fallback_gender(gender: impl Into<String>) -> Self {
        Self {
            fallback_gender: Some(gender.into()),
        }
    }

    pub fn parse(&self, json: &str) -> Result<DialogueScript, ScriptParseError> {
        let root: Value = serde_json::from_str(json.trim())?;

        let (topic, opponent_name, opponent_role, opponent_gender, items) = match &root {
            Value::Object(object) => {
                let items = object
                    .get("script")
                    .and_then(Value::as_array)
                    .ok_or(ScriptParseError::MissingScriptArray)?;
                (
                    string_or(object, "topic", DEFAULT_TOPIC),
                    string_or(object, "opponent_name", "AI Coach"),
                    string_or(object, "opponent_role", DEFAULT_OPPONENT_ROLE),
                    string_or(object, "opponent_gender", &self.fallback_gender()),
                    items,
                )
            }
            Value::Array(items) => (
                DEFAULT_TOPIC.to_string(),
                DEFAULT_OPPONENT_NAME.to_string(),
                DEFAULT_OPPONENT_ROLE.to_string(),
                self.fallback_gender(),
                items,
            ),
            _ => return Err(ScriptParseError::MissingScriptArray),
        };

        let mut turns = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let object = item
                .as_object()
                .ok_or(ScriptParseError::InvalidTurnObject(index))?;
            let korean = string_or(object, "ko", "");
            let english = string_or(object, "en", "");
            let mut role = string_or(object, "role", "");
            if role.is_empty() {
                role = if index % 2 == 0 { "model" } else { "user" }.to_string();
            }
            turns.push(ScriptTurn::new(korean, english, role));
        }

        Ok(DialogueScript::new(
            topic,
            opponent_name,
            opponent_role,
            opponent_gender,
            turns,
        ))
    }

    fn fallback_gender(&self) -> String {
        match &self.fallback_gender {
            Some(gender) => gender.clone(),
            None => if rand::thread_rng().gen_bool(0.5) {
                "male"
            } else {
                "female"
            }
            .to_string(),
        }
    }
}

impl Default for DialogueScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

fn string_or(object: &Map<String, Value>, key: &str, fallback: &str) -> String {
    match object.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => fallback.to_string(),
    }
}
