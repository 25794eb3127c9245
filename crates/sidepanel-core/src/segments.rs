//! Stream segment tracking.
//!
//! Maps a transport-assigned stream key to the transcript message that is
//! receiving its chunks, and accumulates the raw text locally. The store is
//! always handed the full accumulated text, never a diff.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::message::{Message, MessageId, NewMessage};
use crate::store::TranscriptStore;

/// Placeholder shown in a segment's message until its first chunk arrives
pub const DEFAULT_PLACEHOLDER: &str = "...";

static FALLBACK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Synthesize a stream key for a segment whose start event carried none.
///
/// Keys combine the wall clock with a process-wide sequence number, so two
/// segments started in the same millisecond still get distinct keys.
pub fn fallback_stream_key() -> String {
    let seq = FALLBACK_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("stream-{}-{}", chrono::Utc::now().timestamp_millis(), seq)
}

#[derive(Debug, Clone)]
struct Segment {
    message_id: MessageId,
    content: String,
}

/// Routing table from stream key to in-progress assistant message
#[derive(Debug)]
pub struct SegmentTracker {
    segments: HashMap<String, Segment>,
    placeholder: String,
}

impl Default for SegmentTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER)
    }
}

impl SegmentTracker {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            segments: HashMap::new(),
            placeholder: placeholder.into(),
        }
    }

    /// Start a segment: add a placeholder assistant message and route `key` to it.
    ///
    /// A duplicate start is a protocol violation; the new segment wins and the
    /// old placeholder stays in the transcript as it was.
    pub fn begin(&mut self, store: &mut TranscriptStore, key: &str) -> Message {
        let message = store.add_message(NewMessage::assistant(self.placeholder.clone()));
        let previous = self.segments.insert(
            key.to_string(),
            Segment {
                message_id: message.id.clone(),
                content: String::new(),
            },
        );
        if let Some(previous) = previous {
            tracing::warn!(
                stream_key = key,
                previous_message = %previous.message_id,
                "duplicate segment start, replacing"
            );
        }
        message
    }

    /// Append a chunk to the segment for `key`.
    ///
    /// Chunks for unknown keys are dropped: the segment may already be
    /// finalized, or the transcript reset. Returns whether the chunk was applied.
    pub fn append_chunk(&mut self, store: &mut TranscriptStore, key: &str, chunk: &str) -> bool {
        let Some(segment) = self.segments.get_mut(key) else {
            tracing::trace!(stream_key = key, "chunk for unknown segment dropped");
            return false;
        };
        segment.content.push_str(chunk);
        store.update_message(&segment.message_id, segment.content.as_str());
        true
    }

    /// Close the segment for `key`.
    ///
    /// A non-empty `final_text` is authoritative and replaces whatever was
    /// accumulated. If both are empty the placeholder is left untouched.
    pub fn finalize(
        &mut self,
        store: &mut TranscriptStore,
        key: &str,
        final_text: Option<&str>,
    ) -> bool {
        let Some(segment) = self.segments.remove(key) else {
            tracing::trace!(stream_key = key, "finalize for unknown segment ignored");
            return false;
        };
        let text = match final_text {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => segment.content,
        };
        if !text.is_empty() {
            store.update_message(&segment.message_id, text);
        }
        true
    }

    /// Forget every open segment. The store is left alone.
    pub fn clear(&mut self) {
        if !self.segments.is_empty() {
            tracing::debug!(open_segments = self.segments.len(), "clearing stream segments");
        }
        self.segments.clear();
    }

    /// Message currently receiving chunks for `key`
    pub fn message_id(&self, key: &str) -> Option<&str> {
        self.segments.get(key).map(|s| s.message_id.as_str())
    }

    /// Text accumulated so far for `key`
    pub fn accumulated(&self, key: &str) -> Option<&str> {
        self.segments.get(key).map(|s| s.content.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.segments.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
