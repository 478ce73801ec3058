//! Incremental parsing of streamed generation output
//!
//! The generation call produces one JSON document as an ordered sequence of
//! opaque text fragments. These parsers accumulate the fragments and surface
//! structurally complete pieces (metadata fields, array objects) as soon as
//! they close, long before the document itself is complete.

pub mod document;
pub mod extractor;
pub mod quiz;
pub mod scanner;
pub mod script;

pub use document::{DialogueScriptParser, ScriptParseError};
pub use extractor::ArrayObjectExtractor;
pub use quiz::QuizStreamParser;
pub use script::{ScriptParseUpdate, ScriptStreamParser};
