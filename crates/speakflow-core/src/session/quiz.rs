//! Quiz streaming sessions

use std::sync::Arc;

use tracing::info;

use super::store::{
    NoMetadata, SessionDispatcher, SessionId, SessionListener, SessionSnapshot,
    StreamingSessionStore,
};
use crate::generation::manager::{QuizGenerateManager, QuizStreamCallbacks};
use crate::generation::types::{QuizGenerateRequest, QuizQuestion};

pub type QuizSessionSnapshot = SessionSnapshot<NoMetadata, QuizQuestion>;
pub type QuizSessionListener = dyn SessionListener<NoMetadata, QuizQuestion>;

/// Holds one quiz generation per session id and fans completed questions out
/// to attached listeners.
#[derive(Clone, Default)]
pub struct QuizStreamingSessionStore {
    inner: StreamingSessionStore<NoMetadata, QuizQuestion>,
}

impl QuizStreamingSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a session and invoke the upstream generation exactly once.
    /// Must be called within a tokio runtime.
    pub fn start_session(
        &self,
        manager: Arc<dyn QuizGenerateManager>,
        request: QuizGenerateRequest,
    ) -> SessionId {
        let (session_id, dispatcher) = self.inner.create_session();
        info!(
            session = &session_id[..8],
            requested = request.requested_question_count,
            "quiz session start"
        );
        let callbacks: Arc<dyn QuizStreamCallbacks> = Arc::new(dispatcher);
        tokio::spawn(async move {
            manager.generate_quiz_streaming(request, callbacks).await;
        });
        session_id
    }

    pub fn attach(
        &self,
        session_id: &str,
        listener: Arc<QuizSessionListener>,
    ) -> Option<QuizSessionSnapshot> {
        self.inner.attach(session_id, listener)
    }

    pub fn detach(&self, session_id: &str, listener: &Arc<QuizSessionListener>) {
        self.inner.detach(session_id, listener);
    }

    pub fn release(&self, session_id: &str) {
        self.inner.release(session_id);
    }
}

impl QuizStreamCallbacks for SessionDispatcher<NoMetadata, QuizQuestion> {
    fn on_question(&self, question: QuizQuestion) {
        self.item(question);
    }

    fn on_complete(&self, warning: Option<String>) {
        self.complete(warning);
    }

    fn on_failure(&self, error: String) {
        self.failure(error);
    }
}
