//! Turn-advancement state machine
//!
//! Consumes the growing turn list plus the stream-completed flag and exposes
//! a poll-based next-turn decision. "Nothing yet, but more is coming" and
//! "nothing, and nothing more is coming" are distinct outcomes; completion is
//! only ever taken from the explicit upstream signal, never inferred from a
//! transient gap.

use tracing::debug;

use crate::generation::types::{DialogueScript, ScriptTurn};
use crate::parse::document::{DialogueScriptParser, ScriptParseError};

/// Defaults applied while streamed metadata has not arrived yet.
const DEFAULT_TOPIC: &str = "영어 연습";
const DEFAULT_OPPONENT_NAME: &str = "AI Coach";
const DEFAULT_OPPONENT_ROLE: &str = "Partner";
const DEFAULT_OPPONENT_GENDER: &str = "female";

/// Outcome of one [`TurnFlowController::move_to_next_turn`] poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTurn {
    /// The stream finished without ever producing a turn.
    Empty,
    /// No next turn available yet, but the stream is still open.
    Waiting,
    /// The next turn, with its 1-based step and the live total so far.
    Turn {
        turn: ScriptTurn,
        current_step: usize,
        total_steps: usize,
    },
    /// The index has passed the last turn of a finished stream.
    Finished { total_steps: usize },
}

/// Poll-driven cursor over a script that may still be streaming in.
pub struct TurnFlowController {
    script: Option<DialogueScript>,
    consumed: usize,
    stream_completed: bool,
}

impl TurnFlowController {
    pub fn new() -> Self {
        Self {
            script: None,
            consumed: 0,
            stream_completed: false,
        }
    }

    /// Load a complete script document; the stream is trivially finished.
    pub fn load_script(&mut self, script_json: &str) -> Result<(), ScriptParseError> {
        let script = DialogueScriptParser::new().parse(script_json)?;
        debug!(turns = script.len(), "script loaded");
        self.script = Some(script);
        self.consumed = 0;
        self.stream_completed = true;
        Ok(())
    }

    /// Begin an empty streaming script with the given header.
    pub fn start_streaming(
        &mut self,
        topic: &str,
        opponent_name: &str,
        opponent_role: &str,
        opponent_gender: &str,
    ) {
        self.script = Some(DialogueScript::new(
            topic,
            opponent_name,
            opponent_role,
            opponent_gender,
            Vec::new(),
        ));
        self.consumed = 0;
        self.stream_completed = false;
    }

    /// Replace the streaming header; starts a stream if none is active.
    pub fn update_stream_metadata(
        &mut self,
        topic: &str,
        opponent_name: &str,
        opponent_role: &str,
        opponent_gender: &str,
    ) {
        match &mut self.script {
            Some(script) => {
                script.update_metadata(topic, opponent_name, opponent_role, opponent_gender)
            }
            None => self.start_streaming(topic, opponent_name, opponent_role, opponent_gender),
        }
    }

    /// Append one streamed turn, starting a defaulted stream if needed.
    pub fn append_stream_turn(&mut self, turn: ScriptTurn) {
        if self.script.is_none() {
            self.start_streaming(
                DEFAULT_TOPIC,
                DEFAULT_OPPONENT_NAME,
                DEFAULT_OPPONENT_ROLE,
                DEFAULT_OPPONENT_GENDER,
            );
        }
        if let Some(script) = &mut self.script {
            script.append_turn(turn);
        }
    }

    pub fn mark_stream_completed(&mut self) {
        self.stream_completed = true;
    }

    pub fn is_stream_completed(&self) -> bool {
        self.stream_completed
    }

    pub fn script(&self) -> Option<&DialogueScript> {
        self.script.as_ref()
    }

    /// Turns known so far; live until the stream completes.
    pub fn total_steps(&self) -> usize {
        self.script.as_ref().map(DialogueScript::len).unwrap_or(0)
    }

    /// Advance to the next turn if one is available.
    pub fn move_to_next_turn(&mut self) -> NextTurn {
        let Some(script) = &self.script else {
            return if self.stream_completed {
                NextTurn::Empty
            } else {
                NextTurn::Waiting
            };
        };

        let total_steps = script.len();
        if total_steps == 0 {
            return if self.stream_completed {
                NextTurn::Empty
            } else {
                NextTurn::Waiting
            };
        }

        if self.consumed >= total_steps {
            if self.stream_completed {
                self.consumed = total_steps;
                return NextTurn::Finished { total_steps };
            }
            return NextTurn::Waiting;
        }

        let turn = script.turns()[self.consumed].clone();
        self.consumed += 1;
        NextTurn::Turn {
            turn,
            current_step: self.consumed,
            total_steps,
        }
    }
}

impl Default for TurnFlowController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> ScriptTurn {
        ScriptTurn::new(format!("한국어 {n}"), format!("English {n}"), "model")
    }

    #[test]
    fn test_no_script_waits_until_completed() {
        let mut flow = TurnFlowController::new();
        assert_eq!(flow.move_to_next_turn(), NextTurn::Waiting);
        flow.mark_stream_completed();
        assert_eq!(flow.move_to_next_turn(), NextTurn::Empty);
    }

    #[test]
    fn test_completed_stream_with_no_turns_is_empty() {
        let mut flow = TurnFlowController::new();
        flow.start_streaming("카페", "Barista", "Barista", "female");
        assert_eq!(flow.move_to_next_turn(), NextTurn::Waiting);
        flow.mark_stream_completed();
        assert_eq!(flow.move_to_next_turn(), NextTurn::Empty);
    }

    #[test]
    fn test_no_premature_completion() {
        let mut flow = TurnFlowController::new();
        flow.start_streaming("카페", "Barista", "Barista", "female");
        flow.append_stream_turn(turn(1));
        flow.append_stream_turn(turn(2));

        // Two turns known, stream still open: TURN, TURN, WAITING.
        assert!(matches!(
            flow.move_to_next_turn(),
            NextTurn::Turn { current_step: 1, total_steps: 2, .. }
        ));
        assert!(matches!(
            flow.move_to_next_turn(),
            NextTurn::Turn { current_step: 2, total_steps: 2, .. }
        ));
        assert_eq!(flow.move_to_next_turn(), NextTurn::Waiting);

        flow.mark_stream_completed();
        assert_eq!(
            flow.move_to_next_turn(),
            NextTurn::Finished { total_steps: 2 }
        );
        // Terminal stays terminal.
        assert_eq!(
            flow.move_to_next_turn(),
            NextTurn::Finished { total_steps: 2 }
        );
    }

    #[test]
    fn test_total_is_live_while_streaming() {
        let mut flow = TurnFlowController::new();
        flow.append_stream_turn(turn(1));
        let first = flow.move_to_next_turn();
        assert!(matches!(first, NextTurn::Turn { total_steps: 1, .. }));

        flow.append_stream_turn(turn(2));
        flow.append_stream_turn(turn(3));
        let second = flow.move_to_next_turn();
        assert!(matches!(
            second,
            NextTurn::Turn { current_step: 2, total_steps: 3, .. }
        ));
    }

    #[test]
    fn test_waiting_resolves_when_turn_arrives() {
        let mut flow = TurnFlowController::new();
        flow.append_stream_turn(turn(1));
        assert!(matches!(flow.move_to_next_turn(), NextTurn::Turn { .. }));
        assert_eq!(flow.move_to_next_turn(), NextTurn::Waiting);

        flow.append_stream_turn(turn(2));
        assert!(matches!(
            flow.move_to_next_turn(),
            NextTurn::Turn { current_step: 2, .. }
        ));
    }

    #[test]
    fn test_append_without_start_uses_defaults() {
        let mut flow = TurnFlowController::new();
        flow.append_stream_turn(turn(1));
        let script = flow.script().expect("stream should self-start");
        assert_eq!(script.topic(), "영어 연습");
        assert_eq!(script.opponent_name(), "AI Coach");
    }

    #[test]
    fn test_metadata_update_before_turns() {
        let mut flow = TurnFlowController::new();
        flow.update_stream_metadata("주문", "Waiter", "Waiter", "male");
        let script = flow.script().expect("metadata should self-start the stream");
        assert_eq!(script.topic(), "주문");
        assert!(!flow.is_stream_completed());
    }

    #[test]
    fn test_load_complete_script() {
        let mut flow = TurnFlowController::new();
        flow.load_script(
            "{\"topic\":\"카페\",\"opponent_name\":\"Barista\",\"script\":[\
             {\"ko\":\"안녕\",\"en\":\"Hi\",\"role\":\"model\"}]}",
        )
        .unwrap();
        assert!(flow.is_stream_completed());
        assert!(matches!(
            flow.move_to_next_turn(),
            NextTurn::Turn { current_step: 1, total_steps: 1, .. }
        ));
        assert_eq!(
            flow.move_to_next_turn(),
            NextTurn::Finished { total_steps: 1 }
        );
    }

    #[test]
    fn test_load_script_error_propagates() {
        let mut flow = TurnFlowController::new();
        assert!(flow.load_script("{\"no_script\":true}").is_err());
    }
}
