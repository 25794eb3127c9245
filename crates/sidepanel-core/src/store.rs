//! Transcript store: the ordered message list plus processing/error flags.
//!
//! The store is the only writer of transcript state. Every mutation publishes
//! a fresh immutable [`Snapshot`] on a watch channel, so readers never see a
//! half-applied change. Messages are shared between snapshots behind `Arc`,
//! which keeps a streaming update down to one message allocation.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::message::{Message, NewMessage};

/// Immutable view of the transcript handed to the presentation layer
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Bumped on every published change
    pub revision: u64,
    pub messages: Vec<Arc<Message>>,
    pub is_processing: bool,
    pub error: Option<String>,
    pub selected_tab_ids: Vec<u32>,
}

impl Snapshot {
    /// Find a message by id
    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.as_ref())
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last().map(|m| m.as_ref())
    }
}

/// Single-writer owner of the transcript
pub struct TranscriptStore {
    messages: Vec<Arc<Message>>,
    is_processing: bool,
    error: Option<String>,
    selected_tab_ids: Vec<u32>,
    revision: u64,
    /// Set while inside [`TranscriptStore::batch`]
    deferred: bool,
    dirty: bool,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            messages: Vec::new(),
            is_processing: false,
            error: None,
            selected_tab_ids: Vec::new(),
            revision: 0,
            deferred: false,
            dirty: false,
            snapshot_tx,
        }
    }

    /// Append a message, assigning a fresh id and the current timestamp.
    pub fn add_message(&mut self, new: NewMessage) -> Message {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            role: new.role,
            content: new.content,
            timestamp: chrono::Utc::now().timestamp_millis(),
            metadata: new.metadata,
        };
        self.messages.push(Arc::new(message.clone()));
        self.changed();
        message
    }

    /// Replace the content of message `id` in place.
    ///
    /// A missing id is a no-op: updates routinely race with a reset. Returns
    /// whether a message was updated.
    pub fn update_message(&mut self, id: &str, content: impl Into<String>) -> bool {
        let Some(slot) = self.messages.iter_mut().find(|m| m.id == id) else {
            tracing::trace!(message_id = id, "update for unknown message ignored");
            return false;
        };
        Arc::make_mut(slot).content = content.into();
        self.changed();
        true
    }

    /// Mark a tool message as executing or finished. Missing ids are ignored.
    pub fn set_executing(&mut self, id: &str, executing: bool) -> bool {
        let Some(slot) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        Arc::make_mut(slot)
            .metadata
            .get_or_insert_with(Default::default)
            .is_executing = executing;
        self.changed();
        true
    }

    pub fn set_processing(&mut self, processing: bool) {
        if self.is_processing != processing {
            self.is_processing = processing;
            self.changed();
        }
    }

    pub fn set_error(&mut self, error: Option<String>) {
        if self.error != error {
            self.error = error;
            self.changed();
        }
    }

    /// Attach a tab to the next query
    pub fn select_tab(&mut self, tab_id: u32) {
        if !self.selected_tab_ids.contains(&tab_id) {
            self.selected_tab_ids.push(tab_id);
            self.changed();
        }
    }

    pub fn deselect_tab(&mut self, tab_id: u32) {
        let before = self.selected_tab_ids.len();
        self.selected_tab_ids.retain(|id| *id != tab_id);
        if self.selected_tab_ids.len() != before {
            self.changed();
        }
    }

    pub fn clear_selected_tabs(&mut self) {
        if !self.selected_tab_ids.is_empty() {
            self.selected_tab_ids.clear();
            self.changed();
        }
    }

    /// Selected tabs as query context; `None` when nothing is selected
    pub fn tab_context(&self) -> Option<Vec<u32>> {
        if self.selected_tab_ids.is_empty() {
            None
        } else {
            Some(self.selected_tab_ids.clone())
        }
    }

    /// Clear the transcript and both flags.
    ///
    /// Stream segments live outside the store; whoever owns them must clear
    /// them alongside this call.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.is_processing = false;
        self.error = None;
        self.selected_tab_ids.clear();
        self.changed();
    }

    /// Run several mutations and publish a single snapshot at the end.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let outer = std::mem::replace(&mut self.deferred, true);
        let result = f(self);
        self.deferred = outer;
        if !outer && self.dirty {
            self.publish();
        }
        result
    }

    pub fn messages(&self) -> impl ExactSizeIterator<Item = &Message> {
        self.messages.iter().map(|m| m.as_ref())
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_tab_ids(&self) -> &[u32] {
        &self.selected_tab_ids
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    fn changed(&mut self) {
        self.dirty = true;
        if !self.deferred {
            self.publish();
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.dirty = false;
        let snapshot = Snapshot {
            revision: self.revision,
            messages: self.messages.clone(),
            is_processing: self.is_processing,
            error: self.error.clone(),
            selected_tab_ids: self.selected_tab_ids.clone(),
        };
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_add_message_assigns_unique_ids() {
        let mut store = TranscriptStore::new();
        let a = store.add_message(NewMessage::user("hi"));
        let b = store.add_message(NewMessage::user("hi"));
        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
        assert!(a.timestamp > 0);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].id, a.id);
        assert_eq!(snapshot.messages[1].id, b.id);
    }

    #[test]
    fn test_update_message_in_place() {
        let mut store = TranscriptStore::new();
        let first = store.add_message(NewMessage::assistant("..."));
        store.add_message(NewMessage::system("after"));

        assert!(store.update_message(&first.id, "hello"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.messages[0].content, "hello");
        assert_eq!(snapshot.messages[0].id, first.id);
        assert_eq!(snapshot.messages[1].content, "after");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = TranscriptStore::new();
        store.add_message(NewMessage::user("a"));
        let before = store.snapshot();

        assert!(!store.update_message("missing", "x"));

        let after = store.snapshot();
        assert_eq!(after.revision, before.revision);
        assert_eq!(after.messages.len(), 1);
        assert_eq!(after.messages[0].content, "a");
    }

    #[test]
    fn test_old_snapshot_is_not_mutated() {
        let mut store = TranscriptStore::new();
        let msg = store.add_message(NewMessage::assistant("one"));
        let old = store.snapshot();

        store.update_message(&msg.id, "two");

        assert_eq!(old.messages[0].content, "one");
        assert_eq!(store.snapshot().messages[0].content, "two");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = TranscriptStore::new();
        store.add_message(NewMessage::user("q"));
        store.set_processing(true);
        store.set_error(Some("bad".into()));
        store.select_tab(3);

        store.reset();

        let snapshot = store.snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.error, None);
        assert!(snapshot.selected_tab_ids.is_empty());
    }

    #[test]
    fn test_batch_publishes_once() {
        let mut store = TranscriptStore::new();
        let mut rx = store.subscribe();
        let start = store.snapshot().revision;

        store.batch(|s| {
            s.add_message(NewMessage::error("boom"));
            s.set_error(Some("boom".into()));
            s.set_processing(false);
        });

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.revision, start + 1);
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
        assert_eq!(snapshot.messages[0].role, Role::System);
    }

    #[test]
    fn test_batch_without_changes_does_not_publish() {
        let mut store = TranscriptStore::new();
        let start = store.snapshot().revision;
        store.batch(|s| s.set_processing(false));
        assert_eq!(store.snapshot().revision, start);
    }

    #[test]
    fn test_tab_selection() {
        let mut store = TranscriptStore::new();
        assert_eq!(store.tab_context(), None);

        store.select_tab(5);
        store.select_tab(5);
        store.select_tab(8);
        assert_eq!(store.tab_context(), Some(vec![5, 8]));

        store.deselect_tab(5);
        assert_eq!(store.selected_tab_ids(), &[8]);

        store.clear_selected_tabs();
        assert_eq!(store.tab_context(), None);
    }

    #[test]
    fn test_set_executing() {
        let mut store = TranscriptStore::new();
        let msg = store.add_message(NewMessage::tool_result(Some("scroll_tool".into()), "..."));

        assert!(store.set_executing(&msg.id, true));
        assert!(store.message(&msg.id).unwrap().is_executing());
        assert_eq!(store.message(&msg.id).unwrap().tool_name(), Some("scroll_tool"));

        assert!(!store.set_executing("missing", true));
    }
}
