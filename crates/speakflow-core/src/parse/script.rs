//! Dialogue script stream parser
//!
//! Composes the field scanner (metadata) with the array extractor (turns)
//! over one shared buffer of accumulated chunks.

use serde::Deserialize;
use tracing::debug;

use super::extractor::ArrayObjectExtractor;
use super::scanner;
use crate::generation::types::{ScriptMetadata, ScriptTurn};

/// Output of one [`ScriptStreamParser::add_chunk`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptParseUpdate {
    /// Present only when the derived metadata differs from the last emission.
    pub metadata: Option<ScriptMetadata>,
    /// Turns completed by this chunk, in document order.
    pub turns: Vec<ScriptTurn>,
}

/// Incremental parser for the dialogue generation document.
pub struct ScriptStreamParser {
    extractor: ArrayObjectExtractor,
    last_metadata: Option<ScriptMetadata>,
    seen_object_count: usize,
}

impl ScriptStreamParser {
    pub fn new() -> Self {
        Self {
            extractor: ArrayObjectExtractor::new("script"),
            last_metadata: None,
            seen_object_count: 0,
        }
    }

    /// Append a chunk; returns changed metadata plus newly completed turns.
    ///
    /// Metadata is re-derived from the whole buffer on every call and only
    /// surfaced when it differs from the previous emission. Individual turn
    /// objects that fail the strict decode are dropped without affecting the
    /// rest of the stream.
    pub fn add_chunk(&mut self, chunk: &str) -> ScriptParseUpdate {
        let objects = self.extractor.add_chunk(chunk);

        let metadata = scanner::scan_metadata(self.extractor.buffer(), self.last_metadata.as_ref())
            .filter(|derived| self.last_metadata.as_ref() != Some(derived));
        if let Some(derived) = &metadata {
            self.last_metadata = Some(derived.clone());
        }

        let mut turns = Vec::new();
        for object in objects {
            let index = self.seen_object_count;
            self.seen_object_count += 1;
            match decode_turn(&object, index) {
                Some(turn) => turns.push(turn),
                None => debug!(index, "dropping malformed turn object"),
            }
        }

        ScriptParseUpdate { metadata, turns }
    }
}

impl Default for ScriptStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ScriptTurnWire {
    #[serde(default)]
    ko: Option<String>,
    #[serde(default)]
    en: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

/// Strict decode of one completed turn object. `index` is the turn's array
/// position, used for the role parity default (even = opponent).
fn decode_turn(raw: &str, index: usize) -> Option<ScriptTurn> {
    let wire: ScriptTurnWire = serde_json::from_str(raw).ok()?;
    let korean = wire.ko.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let english = wire.en.as_deref().map(str::trim).filter(|s| !s.is_empty())?;

    let role = match wire.role.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(role) => role.to_string(),
        None => if index % 2 == 0 { "model" } else { "user" }.to_string(),
    };

    Some(ScriptTurn::new(korean, english, role))
}
