//! Dialogue script streaming sessions

use std::sync::Arc;

use tracing::info;

use super::store::{
    SessionDispatcher, SessionId, SessionListener, SessionSnapshot, StreamingSessionStore,
};
use crate::generation::manager::{ScriptGenerateManager, ScriptStreamCallbacks};
use crate::generation::types::{ScriptGenerateRequest, ScriptMetadata, ScriptTurn};

pub type ScriptSessionSnapshot = SessionSnapshot<ScriptMetadata, ScriptTurn>;
pub type ScriptSessionListener = dyn SessionListener<ScriptMetadata, ScriptTurn>;

/// Holds one dialogue generation per session id and fans completed turns out
/// to attached listeners, with catch-up snapshots for late joiners.
#[derive(Clone, Default)]
pub struct ScriptStreamingSessionStore {
    inner: StreamingSessionStore<ScriptMetadata, ScriptTurn>,
}

impl ScriptStreamingSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a session and invoke the upstream generation exactly once.
    ///
    /// Returns immediately; all delivery happens from the spawned task.
    /// Releasing the session stops delivery but does not cancel the task,
    /// which finishes quietly against a missing session. Must be called
    /// within a tokio runtime.
    pub fn start_session(
        &self,
        manager: Arc<dyn ScriptGenerateManager>,
        request: ScriptGenerateRequest,
    ) -> SessionId {
        let (session_id, dispatcher) = self.inner.create_session();
        info!(
            session = &session_id[..8],
            topic = %request.topic,
            requested_length = request.requested_length,
            "script session start"
        );
        let callbacks: Arc<dyn ScriptStreamCallbacks> = Arc::new(dispatcher);
        tokio::spawn(async move {
            manager.generate_script_streaming(request, callbacks).await;
        });
        session_id
    }

    pub fn attach(
        &self,
        session_id: &str,
        listener: Arc<ScriptSessionListener>,
    ) -> Option<ScriptSessionSnapshot> {
        self.inner.attach(session_id, listener)
    }

    pub fn detach(&self, session_id: &str, listener: &Arc<ScriptSessionListener>) {
        self.inner.detach(session_id, listener);
    }

    pub fn release(&self, session_id: &str) {
        self.inner.release(session_id);
    }
}

impl ScriptStreamCallbacks for SessionDispatcher<ScriptMetadata, ScriptTurn> {
    fn on_metadata(&self, metadata: ScriptMetadata) {
        self.metadata(metadata);
    }

    fn on_turn(&self, turn: ScriptTurn) {
        self.item(turn);
    }

    fn on_complete(&self, warning: Option<String>) {
        self.complete(warning);
    }

    fn on_failure(&self, error: String) {
        self.failure(error);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::generation::runner::run_script_stream;
    use crate::session::store::SessionStatus;

    /// Replays canned fragments through the real stream runner.
    struct FakeScriptManager {
        chunks: Vec<Result<String, String>>,
    }

    #[async_trait]
    impl ScriptGenerateManager for FakeScriptManager {
        async fn generate_script_streaming(
            &self,
            request: ScriptGenerateRequest,
            callbacks: Arc<dyn ScriptStreamCallbacks>,
        ) {
            let chunks = tokio_stream::iter(
                self.chunks
                    .clone()
                    .into_iter()
                    .map(|chunk| chunk.map_err(anyhow::Error::msg)),
            );
            run_script_stream(chunks, request.requested_length, callbacks).await;
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        metadata: Mutex<Vec<ScriptMetadata>>,
        turns: Mutex<Vec<ScriptTurn>>,
        completions: Mutex<Vec<Option<String>>>,
        failures: Mutex<Vec<String>>,
        terminal: Notify,
    }

    impl SessionListener<ScriptMetadata, ScriptTurn> for RecordingListener {
        fn on_metadata(&self, metadata: &ScriptMetadata) {
            self.metadata.lock().unwrap().push(metadata.clone());
        }
        fn on_item(&self, item: &ScriptTurn) {
            self.turns.lock().unwrap().push(item.clone());
        }
        fn on_complete(&self, warning: Option<&str>) {
            self.completions
                .lock()
                .unwrap()
                .push(warning.map(str::to_string));
            self.terminal.notify_one();
        }
        fn on_failure(&self, error: &str) {
            self.failures.lock().unwrap().push(error.to_string());
            self.terminal.notify_one();
        }
    }

    fn request(length: usize) -> ScriptGenerateRequest {
        ScriptGenerateRequest {
            level: "beginner".to_string(),
            topic: "카페".to_string(),
            format: "dialogue".to_string(),
            requested_length: length,
        }
    }

    async fn await_terminal(listener: &RecordingListener) {
        tokio::time::timeout(Duration::from_secs(2), listener.terminal.notified())
            .await
            .expect("session should reach a terminal status");
    }

    #[tokio::test]
    async fn test_end_to_end_streaming_session() {
        let store = ScriptStreamingSessionStore::new();
        let manager = Arc::new(FakeScriptManager {
            chunks: vec![
                Ok("{\"topic\":\"카페\",\"opponent_name\":\"Barista\",\"script\":[".to_string()),
                Ok("{\"ko\":\"안녕\",\"en\":\"Hi\",\"role\":\"model\"},".to_string()),
                Ok("{\"ko\":\"네\",\"en\":\"Yes\",\"role\":\"user\"}]}".to_string()),
            ],
        });

        let listener = Arc::new(RecordingListener::default());
        let session_id = store.start_session(manager, request(4));
        store
            .attach(&session_id, listener.clone())
            .expect("fresh session should attach");
        await_terminal(&listener).await;

        // The early listener saw everything live.
        assert_eq!(listener.metadata.lock().unwrap().len(), 1);
        assert_eq!(listener.turns.lock().unwrap().len(), 2);
        assert_eq!(*listener.completions.lock().unwrap(), vec![None]);
        assert!(listener.failures.lock().unwrap().is_empty());

        // A late attacher sees the same turns in its snapshot instead.
        let snapshot = store
            .attach(&session_id, Arc::new(RecordingListener::default()))
            .unwrap();
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(
            snapshot.metadata.as_ref().map(|m| m.opponent_name.as_str()),
            Some("Barista")
        );
        assert_eq!(snapshot.status, SessionStatus::Completed { warning: None });
    }

    #[tokio::test]
    async fn test_failed_generation_marks_session_failed() {
        let store = ScriptStreamingSessionStore::new();
        let manager = Arc::new(FakeScriptManager {
            chunks: vec![Err("connection reset".to_string())],
        });

        let listener = Arc::new(RecordingListener::default());
        let session_id = store.start_session(manager, request(4));
        store.attach(&session_id, listener.clone()).unwrap();
        await_terminal(&listener).await;

        assert_eq!(
            *listener.failures.lock().unwrap(),
            vec!["connection reset".to_string()]
        );
        let snapshot = store
            .attach(&session_id, Arc::new(RecordingListener::default()))
            .unwrap();
        assert!(matches!(snapshot.status, SessionStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_release_stops_delivery_without_cancelling() {
        let store = ScriptStreamingSessionStore::new();
        let manager = Arc::new(FakeScriptManager {
            chunks: vec![Ok(
                "{\"topic\":\"t\",\"opponent_name\":\"n\",\"script\":[{\"ko\":\"하나\",\"en\":\"One\"}]}"
                    .to_string(),
            )],
        });

        let session_id = store.start_session(manager, request(4));
        store.release(&session_id);

        // The spawned generation still runs; its dispatches just hit a
        // missing session. Give it time to finish, then confirm nothing
        // resurrected the session.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store
            .attach(&session_id, Arc::new(RecordingListener::default()))
            .is_none());
    }
}
