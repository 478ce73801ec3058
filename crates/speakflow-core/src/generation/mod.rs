//! Upstream generation contracts, typed stream items, and stream runners

pub mod manager;
pub mod runner;
pub mod types;

pub use manager::{
    QuizGenerateManager, QuizStreamCallbacks, ScriptGenerateManager, ScriptStreamCallbacks,
};
pub use runner::{run_quiz_stream, run_script_stream, PARTIAL_STREAM_WARNING};
pub use types::{
    DialogueScript, QuizGenerateRequest, QuizQuestion, ScriptGenerateRequest, ScriptMetadata,
    ScriptTurn,
};
