//! In-memory streaming session store
//!
//! One upstream generation per session id. Completed events are buffered so
//! late-attaching listeners can catch up from a snapshot, then fanned out to
//! everyone currently attached. Listener sets are always copied before
//! dispatch so a callback may re-enter the store (e.g. detach itself)
//! without deadlocking.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Opaque session identifier.
pub type SessionId = String;

/// Marker metadata type for session kinds that have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoMetadata;

/// Lifecycle status of a session. Terminal states never transition further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Completed { warning: Option<String> },
    Failed { error: String },
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Open)
    }
}

/// Receiver half of a session attachment.
///
/// `on_metadata` has a default empty body; session kinds without metadata
/// never call it.
pub trait SessionListener<M, E>: Send + Sync {
    fn on_metadata(&self, _metadata: &M) {}
    fn on_item(&self, item: &E);
    fn on_complete(&self, warning: Option<&str>);
    fn on_failure(&self, error: &str);
}

/// Point-in-time view handed to a listener at attach.
///
/// Events already contained here are never re-delivered to that listener;
/// it only receives events occurring strictly after the attach.
#[derive(Debug, Clone)]
pub struct SessionSnapshot<M, E> {
    pub metadata: Option<M>,
    pub items: Vec<E>,
    pub status: SessionStatus,
}

struct SessionState<M, E> {
    metadata: Option<M>,
    items: Vec<E>,
    status: SessionStatus,
    listeners: Vec<Arc<dyn SessionListener<M, E>>>,
}

impl<M, E> SessionState<M, E> {
    fn new() -> Self {
        Self {
            metadata: None,
            items: Vec::new(),
            status: SessionStatus::Open,
            listeners: Vec::new(),
        }
    }
}

/// Shared, lock-protected map of live sessions.
///
/// All operations are short in-memory critical sections; nothing here blocks
/// on I/O. Cloning the store clones the handle, not the sessions.
pub struct StreamingSessionStore<M, E> {
    sessions: Arc<Mutex<HashMap<SessionId, SessionState<M, E>>>>,
}

impl<M, E> Clone for StreamingSessionStore<M, E> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<M, E> Default for StreamingSessionStore<M, E> {
    fn default() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<M, E> StreamingSessionStore<M, E>
where
    M: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session and hand back its dispatch half.
    pub fn create_session(&self) -> (SessionId, SessionDispatcher<M, E>) {
        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .insert(session_id.clone(), SessionState::new());
        debug!(session = short_id(&session_id), "session created");
        let dispatcher = SessionDispatcher {
            store: self.clone(),
            session_id: session_id.clone(),
        };
        (session_id, dispatcher)
    }

    /// Register a listener and return the catch-up snapshot, or `None` for
    /// an unknown or released session.
    pub fn attach(
        &self,
        session_id: &str,
        listener: Arc<dyn SessionListener<M, E>>,
    ) -> Option<SessionSnapshot<M, E>> {
        let mut sessions = self.sessions.lock();
        let Some(state) = sessions.get_mut(session_id) else {
            debug!(session = short_id(session_id), "attach failed");
            return None;
        };
        if !state
            .listeners
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &listener))
        {
            state.listeners.push(listener);
        }
        debug!(
            session = short_id(session_id),
            listeners = state.listeners.len(),
            buffered = state.items.len(),
            "attach"
        );
        Some(SessionSnapshot {
            metadata: state.metadata.clone(),
            items: state.items.clone(),
            status: state.status.clone(),
        })
    }

    /// Remove a listener; idempotent, unknown sessions are ignored.
    pub fn detach(&self, session_id: &str, listener: &Arc<dyn SessionListener<M, E>>) {
        let mut sessions = self.sessions.lock();
        let Some(state) = sessions.get_mut(session_id) else {
            return;
        };
        state
            .listeners
            .retain(|existing| !Arc::ptr_eq(existing, listener));
        debug!(
            session = short_id(session_id),
            listeners = state.listeners.len(),
            "detach"
        );
    }

    /// Drop the session entirely; subsequent attaches return `None` and
    /// in-flight dispatches for it are discarded.
    pub fn release(&self, session_id: &str) {
        let removed = self.sessions.lock().remove(session_id);
        if removed.is_some() {
            debug!(session = short_id(session_id), "release");
        }
    }

    fn dispatch_metadata(&self, session_id: &str, metadata: M) {
        let listeners = {
            let mut sessions = self.sessions.lock();
            let Some(state) = sessions.get_mut(session_id) else {
                debug!(session = short_id(session_id), "metadata for unknown session dropped");
                return;
            };
            if state.status.is_terminal() {
                debug!(session = short_id(session_id), "metadata after terminal status dropped");
                return;
            }
            state.metadata = Some(metadata.clone());
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_metadata(&metadata);
        }
    }

    fn dispatch_item(&self, session_id: &str, item: E) {
        let listeners = {
            let mut sessions = self.sessions.lock();
            let Some(state) = sessions.get_mut(session_id) else {
                debug!(session = short_id(session_id), "item for unknown session dropped");
                return;
            };
            if state.status.is_terminal() {
                debug!(session = short_id(session_id), "item after terminal status dropped");
                return;
            }
            state.items.push(item.clone());
            debug!(
                session = short_id(session_id),
                buffered = state.items.len(),
                listeners = state.listeners.len(),
                "item"
            );
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_item(&item);
        }
    }

    fn dispatch_complete(&self, session_id: &str, warning: Option<String>) {
        let listeners = {
            let mut sessions = self.sessions.lock();
            let Some(state) = sessions.get_mut(session_id) else {
                return;
            };
            if state.status.is_terminal() {
                debug!(session = short_id(session_id), "duplicate terminal transition dropped");
                return;
            }
            state.status = SessionStatus::Completed {
                warning: warning.clone(),
            };
            debug!(
                session = short_id(session_id),
                buffered = state.items.len(),
                "complete"
            );
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_complete(warning.as_deref());
        }
    }

    fn dispatch_failure(&self, session_id: &str, error: String) {
        let listeners = {
            let mut sessions = self.sessions.lock();
            let Some(state) = sessions.get_mut(session_id) else {
                return;
            };
            if state.status.is_terminal() {
                debug!(session = short_id(session_id), "duplicate terminal transition dropped");
                return;
            }
            // Buffered items stay visible to late attachers; only the status
            // reflects the failure.
            state.status = SessionStatus::Failed {
                error: error.clone(),
            };
            debug!(
                session = short_id(session_id),
                buffered = state.items.len(),
                "failure"
            );
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_failure(&error);
        }
    }
}

/// Write half of a session, handed to the upstream generation wiring.
pub struct SessionDispatcher<M, E> {
    store: StreamingSessionStore<M, E>,
    session_id: SessionId,
}

impl<M, E> Clone for SessionDispatcher<M, E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

impl<M, E> SessionDispatcher<M, E>
where
    M: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn metadata(&self, metadata: M) {
        self.store.dispatch_metadata(&self.session_id, metadata);
    }

    pub fn item(&self, item: E) {
        self.store.dispatch_item(&self.session_id, item);
    }

    pub fn complete(&self, warning: Option<String>) {
        self.store.dispatch_complete(&self.session_id, warning);
    }

    pub fn failure(&self, error: String) {
        self.store.dispatch_failure(&self.session_id, error);
    }
}

fn short_id(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}
