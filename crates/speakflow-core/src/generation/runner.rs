//! Drives a raw fragment stream through a parser into callbacks
//!
//! Transport-agnostic core of a generation manager: the caller supplies the
//! ordered fragment stream (each item a text chunk or a transport error),
//! this module supplies the emission policy.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::manager::{QuizStreamCallbacks, ScriptStreamCallbacks};
use crate::parse::{QuizStreamParser, ScriptStreamParser};

/// Warning attached when a transport error cut the stream off after at least
/// one item was already delivered.
pub const PARTIAL_STREAM_WARNING: &str = "partial stream interrupted";

/// Feed `chunks` through a dialogue script parser, delivering at most
/// `requested_length` turns (minimum 1).
///
/// Policy: a transport error before the first turn fails the call; after at
/// least one turn it completes with [`PARTIAL_STREAM_WARNING`]. A stream that
/// ends without a single decodable turn also fails.
pub async fn run_script_stream<S>(
    mut chunks: S,
    requested_length: usize,
    callbacks: Arc<dyn ScriptStreamCallbacks>,
) where
    S: Stream<Item = Result<String, anyhow::Error>> + Unpin + Send,
{
    let cap = requested_length.max(1);
    let mut parser = ScriptStreamParser::new();
    let mut emitted = 0usize;

    while let Some(next) = chunks.next().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(error) => {
                if emitted > 0 {
                    warn!(emitted, %error, "script stream interrupted after partial output");
                    callbacks.on_complete(Some(PARTIAL_STREAM_WARNING.to_string()));
                } else {
                    warn!(%error, "script stream failed before any turn");
                    callbacks.on_failure(error.to_string());
                }
                return;
            }
        };

        let update = parser.add_chunk(&chunk);
        if let Some(metadata) = update.metadata {
            debug!(topic = %metadata.topic, "script metadata received");
            callbacks.on_metadata(metadata);
        }
        for turn in update.turns {
            if emitted >= cap {
                break;
            }
            emitted += 1;
            debug!(emitted, cap, role = %turn.role, "script turn received");
            callbacks.on_turn(turn);
        }
        if emitted >= cap {
            break;
        }
    }

    if emitted == 0 {
        warn!("script stream finished without valid turns");
        callbacks.on_failure("failed to parse script turns".to_string());
        return;
    }
    info!(emitted, "script stream complete");
    callbacks.on_complete(None);
}

/// Feed `chunks` through a quiz parser, delivering at most `max_questions`
/// questions (clamped to 1..=10). Same policy as [`run_script_stream`].
pub async fn run_quiz_stream<S>(
    mut chunks: S,
    max_questions: usize,
    callbacks: Arc<dyn QuizStreamCallbacks>,
) where
    S: Stream<Item = Result<String, anyhow::Error>> + Unpin + Send,
{
    let cap = max_questions.clamp(1, 10);
    let mut parser = QuizStreamParser::new();
    let mut emitted = 0usize;

    while let Some(next) = chunks.next().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(error) => {
                if emitted > 0 {
                    warn!(emitted, %error, "quiz stream interrupted after partial output");
                    callbacks.on_complete(Some(PARTIAL_STREAM_WARNING.to_string()));
                } else {
                    warn!(%error, "quiz stream failed before any question");
                    callbacks.on_failure(error.to_string());
                }
                return;
            }
        };

        for question in parser.add_chunk(&chunk) {
            if emitted >= cap {
                break;
            }
            emitted += 1;
            debug!(emitted, cap, "quiz question received");
            callbacks.on_question(question);
        }
        if emitted >= cap {
            break;
        }
    }

    if emitted == 0 {
        warn!("quiz stream finished without valid questions");
        callbacks.on_failure("failed to parse quiz questions".to_string());
        return;
    }
    info!(emitted, "quiz stream complete");
    callbacks.on_complete(None);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;

    use super::*;
    use crate::generation::types::{QuizQuestion, ScriptMetadata, ScriptTurn};

    #[derive(Default)]
    struct RecordingScriptCallbacks {
        metadata: Mutex<Vec<ScriptMetadata>>,
        turns: Mutex<Vec<ScriptTurn>>,
        completions: Mutex<Vec<Option<String>>>,
        failures: Mutex<Vec<String>>,
    }

    impl ScriptStreamCallbacks for RecordingScriptCallbacks {
        fn on_metadata(&self, metadata: ScriptMetadata) {
            self.metadata.lock().unwrap().push(metadata);
        }
        fn on_turn(&self, turn: ScriptTurn) {
            self.turns.lock().unwrap().push(turn);
        }
        fn on_complete(&self, warning: Option<String>) {
            self.completions.lock().unwrap().push(warning);
        }
        fn on_failure(&self, error: String) {
            self.failures.lock().unwrap().push(error);
        }
    }

    #[derive(Default)]
    struct RecordingQuizCallbacks {
        questions: Mutex<Vec<QuizQuestion>>,
        completions: Mutex<Vec<Option<String>>>,
        failures: Mutex<Vec<String>>,
    }

    impl QuizStreamCallbacks for RecordingQuizCallbacks {
        fn on_question(&self, question: QuizQuestion) {
            self.questions.lock().unwrap().push(question);
        }
        fn on_complete(&self, warning: Option<String>) {
            self.completions.lock().unwrap().push(warning);
        }
        fn on_failure(&self, error: String) {
            self.failures.lock().unwrap().push(error);
        }
    }

    fn ok_chunks(chunks: &[&str]) -> impl Stream<Item = Result<String, anyhow::Error>> + Unpin {
        tokio_stream::iter(
            chunks
                .iter()
                .map(|c| Ok(c.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_script_stream_completes() {
        let callbacks = Arc::new(RecordingScriptCallbacks::default());
        run_script_stream(
            ok_chunks(&[
                "{\"topic\":\"카페\",\"opponent_name\":\"Barista\",\"script\":[",
                "{\"ko\":\"안녕\",\"en\":\"Hi\",\"role\":\"model\"},",
                "{\"ko\":\"네\",\"en\":\"Yes\",\"role\":\"user\"}]}",
            ]),
            4,
            callbacks.clone(),
        )
        .await;

        assert_eq!(callbacks.metadata.lock().unwrap().len(), 1);
        assert_eq!(callbacks.turns.lock().unwrap().len(), 2);
        assert_eq!(*callbacks.completions.lock().unwrap(), vec![None]);
        assert!(callbacks.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_script_stream_caps_at_requested_length() {
        let callbacks = Arc::new(RecordingScriptCallbacks::default());
        run_script_stream(
            ok_chunks(&[
                "{\"topic\":\"t\",\"opponent_name\":\"n\",\"script\":[\
                 {\"ko\":\"1\",\"en\":\"1\"},{\"ko\":\"2\",\"en\":\"2\"},{\"ko\":\"3\",\"en\":\"3\"}]}",
            ]),
            2,
            callbacks.clone(),
        )
        .await;

        assert_eq!(callbacks.turns.lock().unwrap().len(), 2);
        assert_eq!(*callbacks.completions.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_script_stream_without_turns_fails() {
        let callbacks = Arc::new(RecordingScriptCallbacks::default());
        run_script_stream(ok_chunks(&["{\"topic\":\"t\"}"]), 3, callbacks.clone()).await;

        assert!(callbacks.completions.lock().unwrap().is_empty());
        assert_eq!(callbacks.failures.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_before_output_fails() {
        let callbacks = Arc::new(RecordingScriptCallbacks::default());
        let chunks = tokio_stream::iter(vec![Err(anyhow!("connection reset"))]);
        run_script_stream(chunks, 3, callbacks.clone()).await;

        assert_eq!(
            *callbacks.failures.lock().unwrap(),
            vec!["connection reset".to_string()]
        );
        assert!(callbacks.completions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_after_output_completes_with_warning() {
        let callbacks = Arc::new(RecordingQuizCallbacks::default());
        let chunks = tokio_stream::iter(vec![
            Ok("{\"questions\":[{\"question_main\":\"Q\",\"answer\":\"A\"},".to_string()),
            Err(anyhow!("connection reset")),
        ]);
        run_quiz_stream(chunks, 5, callbacks.clone()).await;

        assert_eq!(callbacks.questions.lock().unwrap().len(), 1);
        assert_eq!(
            *callbacks.completions.lock().unwrap(),
            vec![Some(PARTIAL_STREAM_WARNING.to_string())]
        );
        assert!(callbacks.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quiz_stream_clamps_count() {
        let callbacks = Arc::new(RecordingQuizCallbacks::default());
        let mut payload = String::from("{\"questions\":[");
        for i in 0..15 {
            if i > 0 {
                payload.push(',');
            }
            payload.push_str(&format!(
                "{{\"question_main\":\"Q{i}\",\"answer\":\"A{i}\"}}"
            ));
        }
        payload.push_str("]}");
        run_quiz_stream(ok_chunks(&[&payload]), 50, callbacks.clone()).await;

        assert_eq!(callbacks.questions.lock().unwrap().len(), 10);
        assert_eq!(*callbacks.completions.lock().unwrap(), vec![None]);
    }
}
