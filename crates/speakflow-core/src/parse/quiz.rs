//! Quiz question stream parser

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::extractor::ArrayObjectExtractor;
use crate::generation::types::QuizQuestion;

/// Incremental parser for the quiz generation document.
pub struct QuizStreamParser {
    extractor: ArrayObjectExtractor,
}

impl QuizStreamParser {
    pub fn new() -> Self {
        Self {
            extractor: ArrayObjectExtractor::new("questions"),
        }
    }

    /// Append a chunk and return the questions it completed.
    ///
    /// Malformed question objects are dropped; one bad element never poisons
    /// the rest of the stream.
    pub fn add_chunk(&mut self, chunk: &str) -> Vec<QuizQuestion> {
        self.extractor
            .add_chunk(chunk)
            .iter()
            .filter_map(|object| {
                let question = decode_question(object);
                if question.is_none() {
                    debug!("dropping malformed question object");
                }
                question
            })
            .collect()
    }
}

impl Default for QuizStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct QuizQuestionWire {
    #[serde(default, alias = "question")]
    question_main: Option<String>,
    #[serde(default)]
    question_material: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    choices: Option<Vec<Value>>,
    #[serde(default)]
    explanation: Option<String>,
}

fn decode_question(raw: &str) -> Option<QuizQuestion> {
    let wire: QuizQuestionWire = serde_json::from_str(raw).ok()?;
    let question_main = trim_to_non_blank(wire.question_main.as_deref()?)?;
    let answer = trim_to_non_blank(wire.answer.as_deref()?)?;

    Some(QuizQuestion {
        question_main,
        question_material: wire
            .question_material
            .as_deref()
            .and_then(trim_to_non_blank),
        answer,
        choices: sanitize_choices(wire.choices.unwrap_or_default()),
        explanation: wire.explanation.as_deref().and_then(trim_to_non_blank),
    })
}

/// Trim choices, drop blanks and non-strings, and dedupe on a normalized
/// (lowercased, whitespace-collapsed) key while keeping first spellings.
fn sanitize_choices(choices: Vec<Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for choice in choices {
        let Some(text) = choice.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        if seen.insert(normalize(text)) {
            result.push(text.to_string());
        }
    }
    result
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn trim_to_non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
