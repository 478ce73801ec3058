//! Streaming session stores
//!
//! One session per upstream generation call: buffered events, dynamic
//! listener fan-out, and snapshot catch-up for late joiners.

pub mod quiz;
pub mod script;
pub mod store;

pub use quiz::{QuizSessionSnapshot, QuizStreamingSessionStore};
pub use script::{ScriptSessionSnapshot, ScriptStreamingSessionStore};
pub use store::{
    NoMetadata, SessionDispatcher, SessionId, SessionListener, SessionSnapshot, SessionStatus,
    StreamingSessionStore,
};
