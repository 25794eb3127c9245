//! Event reconciler: folds inbound events into the transcript.
//!
//! Events are applied one at a time, in delivery order. Each event's effects
//! are published as a single snapshot. Nothing here fails: unknown events are
//! ignored and references to vanished messages or segments are no-ops.

use std::sync::Arc;

use sidepanel_protocol::InboundMessage;

use crate::events::PanelEvent;
use crate::message::NewMessage;
use crate::segments::{SegmentTracker, fallback_stream_key};
use crate::store::{Snapshot, TranscriptStore};

/// Fallback text for error events that carry neither error nor content
pub const DEFAULT_ERROR_TEXT: &str = "An error occurred";

/// Owns the transcript store and the segment routing table
#[derive(Default)]
pub struct Reconciler {
    store: TranscriptStore,
    segments: SegmentTracker,
}

impl Reconciler {
    /// Create a reconciler whose segment placeholders use `placeholder`
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            store: TranscriptStore::new(),
            segments: SegmentTracker::new(placeholder),
        }
    }

    /// Decode and apply a port message
    pub fn apply_inbound(&mut self, message: InboundMessage) {
        self.apply(PanelEvent::from_inbound(message));
    }

    /// Apply one event
    pub fn apply(&mut self, event: PanelEvent) {
        tracing::trace!(event = event.name(), "reconciling");
        let Self { store, segments } = self;

        store.batch(|store| match event {
            PanelEvent::SystemMessage { content } => {
                if let Some(content) = non_empty(content) {
                    store.add_message(NewMessage::system(content));
                }
            }
            PanelEvent::NewSegment { stream_key } => {
                let key = stream_key
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(fallback_stream_key);
                segments.begin(store, &key);
            }
            PanelEvent::StreamingChunk {
                stream_key,
                content,
            } => {
                if let (Some(key), Some(chunk)) = (non_empty(stream_key), non_empty(content)) {
                    segments.append_chunk(store, &key, &chunk);
                }
            }
            PanelEvent::FinalizeSegment {
                stream_key,
                content,
            } => {
                if let Some(key) = non_empty(stream_key) {
                    segments.finalize(store, &key, content.as_deref());
                }
            }
            PanelEvent::ToolResult { tool_name, content } => {
                if let Some(content) = non_empty(content) {
                    store.add_message(NewMessage::tool_result(tool_name, content));
                }
            }
            PanelEvent::ErrorMessage { error, content } => {
                let text = non_empty(error)
                    .or_else(|| non_empty(content))
                    .unwrap_or_else(|| DEFAULT_ERROR_TEXT.to_string());
                store.add_message(NewMessage::error(text.clone()));
                store.set_error(Some(text));
                store.set_processing(false);
            }
            PanelEvent::TaskResult { content } | PanelEvent::CancelMessage { content } => {
                store.set_processing(false);
                if let Some(content) = non_empty(content) {
                    store.add_message(NewMessage::system(content));
                }
            }
            PanelEvent::WorkflowStatus(status) => {
                if status.is_terminal() {
                    store.set_processing(false);
                    if !status.is_cancelled() {
                        if let Some(error) = non_empty(status.error) {
                            store.set_error(Some(error.clone()));
                            store.add_message(NewMessage::error(error));
                        }
                    }
                }
            }
            PanelEvent::Ignored { kind } => {
                tracing::debug!(kind = %kind, "ignoring inbound event");
            }
        });
    }

    /// Clear the transcript and drop every open segment.
    pub fn reset(&mut self) {
        self.segments.clear();
        self.store.reset();
    }

    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    /// Mutable store access for the submission protocol
    pub fn store_mut(&mut self) -> &mut TranscriptStore {
        &mut self.store
    }

    pub fn segments(&self) -> &SegmentTracker {
        &self.segments
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use sidepanel_protocol::{StreamDetails, WorkflowState, WorkflowStatusPayload};

    fn new_segment(key: &str) -> PanelEvent {
        PanelEvent::NewSegment {
            stream_key: Some(key.into()),
        }
    }

    fn chunk(key: &str, text: &str) -> PanelEvent {
        PanelEvent::StreamingChunk {
            stream_key: Some(key.into()),
            content: Some(text.into()),
        }
    }

    fn finalize(key: &str, text: Option<&str>) -> PanelEvent {
        PanelEvent::FinalizeSegment {
            stream_key: Some(key.into()),
            content: text.map(Into::into),
        }
    }

    fn contents(r: &Reconciler) -> Vec<(Role, String)> {
        r.store()
            .messages()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    #[test]
    fn test_stream_lifecycle_yields_one_message() {
        let mut r = Reconciler::default();
        r.apply(new_segment("k"));
        r.apply(chunk("k", "c1"));
        r.apply(chunk("k", "c2"));
        r.apply(finalize("k", None));

        assert_eq!(contents(&r), vec![(Role::Assistant, "c1c2".to_string())]);
        assert!(r.segments().is_empty());
    }

    #[test]
    fn test_finalize_text_overrides_chunks() {
        let mut r = Reconciler::default();
        r.apply(new_segment("k"));
        r.apply(chunk("k", "partial"));
        r.apply(finalize("k", Some("complete")));

        assert_eq!(contents(&r), vec![(Role::Assistant, "complete".to_string())]);
    }

    #[test]
    fn test_unknown_stream_key_is_harmless() {
        let mut r = Reconciler::default();
        r.apply(PanelEvent::SystemMessage {
            content: Some("hi".into()),
        });
        let before = r.snapshot();

        r.apply(chunk("nope", "x"));
        r.apply(finalize("nope", Some("y")));
        r.apply(PanelEvent::StreamingChunk {
            stream_key: None,
            content: Some("z".into()),
        });
        r.apply(PanelEvent::FinalizeSegment {
            stream_key: None,
            content: Some("z".into()),
        });

        let after = r.snapshot();
        assert_eq!(after.revision, before.revision);
        assert_eq!(contents(&r), vec![(Role::System, "hi".to_string())]);
    }

    #[test]
    fn test_empty_chunk_is_ignored() {
        let mut r = Reconciler::default();
        r.apply(new_segment("k"));
        r.apply(chunk("k", ""));
        assert_eq!(r.segments().accumulated("k"), Some(""));
        assert_eq!(contents(&r)[0].1, "...");
    }

    #[test]
    fn test_reset_discards_segments() {
        let mut r = Reconciler::default();
        r.apply(new_segment("k"));
        r.apply(chunk("k", "old"));
        r.store_mut().set_processing(true);
        r.store_mut().set_error(Some("e".into()));

        r.reset();
        r.apply(chunk("k", "late"));
        r.apply(finalize("k", Some("late final")));

        let snapshot = r.snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.error, None);
    }

    #[test]
    fn test_error_sequence_final_state() {
        let mut r = Reconciler::default();
        r.store_mut().set_processing(true);

        r.apply(PanelEvent::SystemMessage {
            content: Some("hi".into()),
        });
        r.apply(new_segment("A"));
        r.apply(chunk("A", "foo"));
        r.apply(PanelEvent::ErrorMessage {
            error: Some("boom".into()),
            content: None,
        });

        let snapshot = r.snapshot();
        let summary: Vec<_> = snapshot
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str(), m.is_error()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Role::System, "hi", false),
                (Role::Assistant, "foo", false),
                (Role::System, "boom", true),
            ]
        );
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_error_text_fallbacks() {
        let mut r = Reconciler::default();
        r.apply(PanelEvent::ErrorMessage {
            error: Some(String::new()),
            content: Some("from content".into()),
        });
        r.apply(PanelEvent::ErrorMessage {
            error: None,
            content: None,
        });

        let texts: Vec<_> = contents(&r).into_iter().map(|(_, c)| c).collect();
        assert_eq!(texts, vec!["from content", DEFAULT_ERROR_TEXT]);
        assert_eq!(r.store().error(), Some(DEFAULT_ERROR_TEXT));
    }

    #[test]
    fn test_tool_result_is_fresh_message() {
        let mut r = Reconciler::default();
        r.apply(new_segment("k"));
        r.apply(PanelEvent::ToolResult {
            tool_name: Some("search_tool".into()),
            content: Some("found".into()),
        });
        r.apply(chunk("k", "text"));
        r.apply(PanelEvent::ToolResult {
            tool_name: Some("search_tool".into()),
            content: None,
        });

        let snapshot = r.snapshot();
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].content, "text");
        assert_eq!(snapshot.messages[1].tool_name(), Some("search_tool"));
        assert_eq!(snapshot.messages[1].role, Role::Assistant);
        assert_eq!(r.segments().len(), 1);
    }

    #[test]
    fn test_task_result_and_cancel_stop_processing() {
        let mut r = Reconciler::default();
        r.store_mut().set_processing(true);
        r.apply(PanelEvent::TaskResult { content: None });
        assert!(!r.store().is_processing());
        assert!(r.store().is_empty());

        r.store_mut().set_processing(true);
        r.apply(PanelEvent::CancelMessage {
            content: Some("Task cancelled".into()),
        });
        assert!(!r.store().is_processing());
        assert_eq!(contents(&r), vec![(Role::System, "Task cancelled".to_string())]);
    }

    #[test]
    fn test_late_terminal_event_keeps_processing_false() {
        let mut r = Reconciler::default();
        r.apply(PanelEvent::TaskResult {
            content: Some("done".into()),
        });
        r.apply(PanelEvent::TaskResult { content: None });
        assert!(!r.store().is_processing());
    }

    #[test]
    fn test_workflow_status_handling() {
        let mut r = Reconciler::default();
        r.store_mut().set_processing(true);

        r.apply(PanelEvent::WorkflowStatus(WorkflowStatusPayload {
            status: Some(WorkflowState::Running),
            error: Some("ignored while running".into()),
            ..Default::default()
        }));
        assert!(r.store().is_processing());
        assert!(r.store().is_empty());

        r.apply(PanelEvent::WorkflowStatus(WorkflowStatusPayload {
            status: Some(WorkflowState::Failed),
            error: Some("page crashed".into()),
            ..Default::default()
        }));
        assert!(!r.store().is_processing());
        assert_eq!(r.store().error(), Some("page crashed"));
        let last = r.snapshot().last_message().cloned().unwrap();
        assert!(last.is_error());
        assert_eq!(last.content, "page crashed");
    }

    #[test]
    fn test_cancelled_workflow_suppresses_error() {
        let mut r = Reconciler::default();
        r.store_mut().set_processing(true);
        r.apply(PanelEvent::WorkflowStatus(WorkflowStatusPayload {
            status: Some(WorkflowState::Failed),
            error: Some("aborted".into()),
            cancelled: Some(true),
        }));
        assert!(!r.store().is_processing());
        assert_eq!(r.store().error(), None);
        assert!(r.store().is_empty());
    }

    #[test]
    fn test_ignored_events_change_nothing() {
        let mut r = Reconciler::default();
        let before = r.snapshot().revision;
        r.apply(PanelEvent::Ignored {
            kind: "DebugMessage".into(),
        });
        r.apply_inbound(InboundMessage::stream(StreamDetails::new("ThinkingMessage")));
        assert_eq!(r.snapshot().revision, before);
    }

    #[test]
    fn test_segment_without_key_gets_fallback() {
        let mut r = Reconciler::default();
        r.apply(PanelEvent::NewSegment { stream_key: None });
        r.apply(PanelEvent::NewSegment {
            stream_key: Some(String::new()),
        });
        assert_eq!(r.store().len(), 2);
        assert_eq!(r.segments().len(), 2);
    }

    #[test]
    fn test_each_event_publishes_once() {
        let mut r = Reconciler::default();
        let start = r.snapshot().revision;
        r.store_mut().set_processing(true);
        r.apply(PanelEvent::ErrorMessage {
            error: Some("x".into()),
            content: None,
        });
        assert_eq!(r.snapshot().revision, start + 2);
    }
}
