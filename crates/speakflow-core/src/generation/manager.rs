//! Contracts for the upstream generation collaborators
//!
//! The transport that actually talks to the model lives outside this crate.
//! Each feature selects a concrete manager at construction time and consumes
//! it through these callback-style traits; no reflection, no service lookup.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    QuizGenerateRequest, QuizQuestion, ScriptGenerateRequest, ScriptMetadata, ScriptTurn,
};

/// Delivery surface for one dialogue generation call.
pub trait ScriptStreamCallbacks: Send + Sync {
    fn on_metadata(&self, metadata: ScriptMetadata);
    fn on_turn(&self, turn: ScriptTurn);
    fn on_complete(&self, warning: Option<String>);
    fn on_failure(&self, error: String);
}

/// Delivery surface for one quiz generation call.
pub trait QuizStreamCallbacks: Send + Sync {
    fn on_question(&self, question: QuizQuestion);
    fn on_complete(&self, warning: Option<String>);
    fn on_failure(&self, error: String);
}

/// Upstream dialogue generation, invoked exactly once per session.
#[async_trait]
pub trait ScriptGenerateManager: Send + Sync {
    async fn generate_script_streaming(
        &self,
        request: ScriptGenerateRequest,
        callbacks: Arc<dyn ScriptStreamCallbacks>,
    );
}

/// Upstream quiz generation, invoked exactly once per session.
#[async_trait]
pub trait QuizGenerateManager: Send + Sync {
    async fn generate_quiz_streaming(
        &self,
        request: QuizGenerateRequest,
        callbacks: Arc<dyn QuizStreamCallbacks>,
    );
}
