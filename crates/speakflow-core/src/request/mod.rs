//! Stale-request tracking for concurrent generation channels
//!
//! Each named channel remembers the id of its latest accepted request.
//! Asynchronous callbacks capture the id they were issued and check it
//! against the channel before applying results, so superseded, out-of-order,
//! or invalidated work is dropped silently.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Per-turn speaking analysis requests.
pub const CHANNEL_SPEAKING_ANALYSIS: &str = "speaking-analysis";
/// Per-sentence feedback requests.
pub const CHANNEL_SENTENCE_FEEDBACK: &str = "sentence-feedback";
/// Extra-question requests raised from a turn.
pub const CHANNEL_EXTRA_QUESTION: &str = "extra-question";
/// Script generation itself.
pub const CHANNEL_SCRIPT_GENERATION: &str = "script-generation";

/// Reserved "nothing accepted" id; never issued.
const NO_REQUEST: u64 = 0;

/// Monotonic latest-request registry.
///
/// Ids come from a single sequence shared by every channel of this tracker
/// and are never reused. Construct one per owning scope and inject it; tests
/// get independent instances for free.
#[derive(Debug, Default)]
pub struct RequestTracker {
    sequence: AtomicU64,
    latest_by_channel: DashMap<String, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id and make it the channel's latest.
    pub fn next_request_id(&self, channel: &str) -> u64 {
        let request_id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest_by_channel.insert(channel.to_string(), request_id);
        request_id
    }

    /// True iff `request_id` is non-zero and still the channel's latest.
    pub fn is_latest(&self, channel: &str, request_id: u64) -> bool {
        if request_id == NO_REQUEST {
            return false;
        }
        self.latest_by_channel
            .get(channel)
            .is_some_and(|latest| *latest == request_id)
    }

    /// Permanently reject every in-flight request on the channel.
    ///
    /// The stored id becomes the reserved sentinel, which no issued id can
    /// equal; a later `next_request_id` opens a fresh, unrelated lane.
    pub fn invalidate(&self, channel: &str) {
        self.latest_by_channel.insert(channel.to_string(), NO_REQUEST);
    }

    /// Invalidate all four well-known channels.
    pub fn invalidate_all(&self) {
        for channel in [
            CHANNEL_SPEAKING_ANALYSIS,
            CHANNEL_SENTENCE_FEEDBACK,
            CHANNEL_EXTRA_QUESTION,
            CHANNEL_SCRIPT_GENERATION,
        ] {
            self.invalidate(channel);
        }
    }

    /// Drop per-turn work when the learner advances to the next turn; script
    /// generation survives the boundary.
    pub fn clear_for_turn_boundary(&self) {
        self.invalidate(CHANNEL_SPEAKING_ANALYSIS);
        self.invalidate(CHANNEL_SENTENCE_FEEDBACK);
        self.invalidate(CHANNEL_EXTRA_QUESTION);
    }
}
