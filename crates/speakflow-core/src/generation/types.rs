//! Typed items flowing out of a generation stream

use serde::Serialize;

/// One line of a generated dialogue, tagged with which party speaks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptTurn {
    pub korean: String,
    pub english: String,
    /// `model` (opponent) or `user` (learner) on the wire.
    pub role: String,
}

impl ScriptTurn {
    pub fn new(
        korean: impl Into<String>,
        english: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            korean: korean.into(),
            english: english.into(),
            role: role.into(),
        }
    }

    pub fn is_opponent_turn(&self) -> bool {
        self.role.eq_ignore_ascii_case("model") || self.role.eq_ignore_ascii_case("opponent")
    }
}

/// Descriptive header of a generated dialogue.
///
/// Values may shift as more of the document arrives; consumers are notified
/// only when the derived value actually changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptMetadata {
    pub topic: String,
    pub opponent_name: String,
    pub opponent_gender: String,
}

impl ScriptMetadata {
    pub fn new(
        topic: impl Into<String>,
        opponent_name: impl Into<String>,
        opponent_gender: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            opponent_name: opponent_name.into(),
            opponent_gender: opponent_gender.into(),
        }
    }
}

/// One quiz item completed by the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub question_main: String,
    /// Supplementary material the question refers to (a sentence, a word).
    pub question_material: Option<String>,
    pub answer: String,
    /// Multiple-choice options; empty when the question is open-ended.
    pub choices: Vec<String>,
    pub explanation: Option<String>,
}

/// A complete dialogue script, either fully parsed from a finished document
/// or assembled turn by turn while streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueScript {
    topic: String,
    opponent_name: String,
    opponent_role: String,
    opponent_gender: String,
    turns: Vec<ScriptTurn>,
}

impl DialogueScript {
    pub fn new(
        topic: impl Into<String>,
        opponent_name: impl Into<String>,
        opponent_role: impl Into<String>,
        opponent_gender: impl Into<String>,
        turns: Vec<ScriptTurn>,
    ) -> Self {
        Self {
            topic: topic.into(),
            opponent_name: opponent_name.into(),
            opponent_role: opponent_role.into(),
            opponent_gender: opponent_gender.into(),
            turns,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn opponent_name(&self) -> &str {
        &self.opponent_name
    }

    pub fn opponent_role(&self) -> &str {
        &self.opponent_role
    }

    pub fn opponent_gender(&self) -> &str {
        &self.opponent_gender
    }

    pub fn turns(&self) -> &[ScriptTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append_turn(&mut self, turn: ScriptTurn) {
        self.turns.push(turn);
    }

    pub fn update_metadata(
        &mut self,
        topic: impl Into<String>,
        opponent_name: impl Into<String>,
        opponent_role: impl Into<String>,
        opponent_gender: impl Into<String>,
    ) {
        self.topic = topic.into();
        self.opponent_name = opponent_name.into();
        self.opponent_role = opponent_role.into();
        self.opponent_gender = opponent_gender.into();
    }
}

/// Parameters for one dialogue generation call.
#[derive(Debug, Clone)]
pub struct ScriptGenerateRequest {
    pub level: String,
    pub topic: String,
    pub format: String,
    /// Number of turns to request; delivery is capped at this count.
    pub requested_length: usize,
}

/// Parameters for one quiz generation call.
#[derive(Debug, Clone)]
pub struct QuizGenerateRequest {
    pub level: String,
    pub topic: String,
    pub requested_question_count: usize,
}

impl QuizGenerateRequest {
    /// Requested count clamped to the supported 1..=10 range.
    pub fn clamped_question_count(&self) -> usize {
        self.requested_question_count.clamp(1, 10)
    }
}
