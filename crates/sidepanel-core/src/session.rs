//! The panel session: submission protocol plus the reconciliation loop.
//!
//! A [`Session`] owns the reconciler and the outbound port. It can be driven
//! one step at a time (`submit`, `handle_inbound`, `fire_due_follow_up`) or
//! handed to [`Session::run`], which multiplexes the inbound stream, UI
//! commands and the interrupt grace timer until shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use sidepanel_protocol::{InboundMessage, OutboundCommand, SOURCE_SIDEPANEL};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::handle::{SessionHandle, UiCommand};
use crate::message::NewMessage;
use crate::port::Port;
use crate::reconciler::Reconciler;
use crate::segments::DEFAULT_PLACEHOLDER;
use crate::store::Snapshot;

/// Delay between an interrupting CANCEL and the follow-up query
pub const DEFAULT_INTERRUPT_GRACE: Duration = Duration::from_millis(300);

/// Shown instead of sending when the port is down
pub const DISCONNECTED_MESSAGE: &str = "Cannot send message: Extension is disconnected";

/// Cancel reason used when a new query interrupts a running task
pub const INTERRUPT_REASON: &str = "User interrupted with new query";

/// Cancel reason used for an explicit user cancel
pub const CANCEL_REASON: &str = "User requested cancellation";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long to wait after an interrupting cancel before sending the follow-up
    pub interrupt_grace: Duration,
    /// `source` tag on every outbound command
    pub source: String,
    /// Text shown in a segment's message before its first chunk
    pub placeholder: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interrupt_grace: DEFAULT_INTERRUPT_GRACE,
            source: SOURCE_SIDEPANEL.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

/// What a call to [`Session::submit`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing happened
    Ignored,
    /// The port is down; a local error message was added
    Disconnected,
    /// The query was sent
    Sent,
    /// The running task was cancelled and a follow-up armed
    Interrupting,
}

#[derive(Debug, Clone)]
struct PendingFollowUp {
    query: String,
    tab_ids: Option<Vec<u32>>,
    due: Instant,
}

/// Owns the transcript and speaks the submission protocol over a [`Port`]
pub struct Session {
    config: SessionConfig,
    reconciler: Reconciler,
    port: Arc<dyn Port>,
    pending: Option<PendingFollowUp>,
    commands_tx: mpsc::UnboundedSender<UiCommand>,
    commands_rx: mpsc::UnboundedReceiver<UiCommand>,
}

impl Session {
    pub fn new(port: Arc<dyn Port>) -> Self {
        Self::with_config(port, SessionConfig::default())
    }

    pub fn with_config(port: Arc<dyn Port>, config: SessionConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            reconciler: Reconciler::new(config.placeholder.clone()),
            config,
            port,
            pending: None,
            commands_tx,
            commands_rx,
        }
    }

    /// Get a cloneable handle for driving this session from elsewhere
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            commands: self.commands_tx.clone(),
            snapshots: self.reconciler.store().subscribe(),
        }
    }

    /// Submit raw composer input.
    ///
    /// While a task is running, non-blank input interrupts it: a CANCEL goes
    /// out now and the query follows once the grace delay has passed. Input
    /// arriving while a follow-up is armed replaces that follow-up, even if
    /// the cancelled task already reported its end.
    pub fn submit(&mut self, input: &str) -> SubmitOutcome {
        let query = input.trim();
        if query.is_empty() {
            return SubmitOutcome::Ignored;
        }

        if self.reconciler.store().is_processing() || self.pending.is_some() {
            if !self.port.is_connected() {
                self.report_disconnected();
                return SubmitOutcome::Disconnected;
            }
            self.send(OutboundCommand::cancel_task(
                INTERRUPT_REASON,
                self.config.source.clone(),
            ));
            let due = Instant::now() + self.config.interrupt_grace;
            if let Some(previous) = self.pending.replace(PendingFollowUp {
                query: query.to_string(),
                tab_ids: self.reconciler.store().tab_context(),
                due,
            }) {
                tracing::debug!(dropped = %previous.query, "replacing armed follow-up");
            }
            tracing::info!(
                grace_ms = self.config.interrupt_grace.as_millis() as u64,
                "interrupting running task"
            );
            return SubmitOutcome::Interrupting;
        }

        let tab_ids = self.reconciler.store().tab_context();
        self.submit_now(input, tab_ids)
    }

    fn submit_now(&mut self, query: &str, tab_ids: Option<Vec<u32>>) -> SubmitOutcome {
        if !self.port.is_connected() {
            // Either idle, or a follow-up whose task was cancelled: nothing is running
            self.reconciler.store_mut().batch(|store| {
                tracing::warn!("port disconnected, query not sent");
                store.add_message(NewMessage::error(DISCONNECTED_MESSAGE));
                store.set_processing(false);
            });
            return SubmitOutcome::Disconnected;
        }

        let trimmed = query.trim().to_string();
        self.reconciler.store_mut().batch(|store| {
            store.add_message(NewMessage::user(query));
            store.set_processing(true);
        });
        self.send(OutboundCommand::execute_query(
            trimmed,
            tab_ids,
            self.config.source.clone(),
        ));
        self.reconciler.store_mut().clear_selected_tabs();
        SubmitOutcome::Sent
    }

    /// Cancel the running task. Local state stops processing immediately.
    pub fn cancel(&mut self) {
        self.send(OutboundCommand::cancel_task(
            CANCEL_REASON,
            self.config.source.clone(),
        ));
        if self.pending.take().is_some() {
            tracing::debug!("cancel dropped armed follow-up");
        }
        self.reconciler.store_mut().set_processing(false);
    }

    /// Ask the background to reset and clear local state regardless of delivery
    pub fn reset(&mut self) {
        self.send(OutboundCommand::reset_conversation(
            self.config.source.clone(),
        ));
        self.pending = None;
        self.reconciler.reset();
    }

    /// Reconcile one message from the port
    pub fn handle_inbound(&mut self, message: InboundMessage) {
        self.reconciler.apply_inbound(message);
    }

    /// Apply one queued UI command
    pub fn handle_command(&mut self, command: UiCommand) {
        match command {
            UiCommand::Submit(input) => {
                self.submit(&input);
            }
            UiCommand::Cancel => self.cancel(),
            UiCommand::Reset => self.reset(),
            UiCommand::SelectTab(id) => self.select_tab(id),
            UiCommand::DeselectTab(id) => self.deselect_tab(id),
        }
    }

    pub fn select_tab(&mut self, tab_id: u32) {
        self.reconciler.store_mut().select_tab(tab_id);
    }

    pub fn deselect_tab(&mut self, tab_id: u32) {
        self.reconciler.store_mut().deselect_tab(tab_id);
    }

    /// Mark a tool message as executing or finished. Unknown ids are ignored.
    pub fn set_executing(&mut self, message_id: &str, executing: bool) -> bool {
        self.reconciler
            .store_mut()
            .set_executing(message_id, executing)
    }

    /// Send the armed follow-up if its deadline has passed. Returns whether it fired.
    pub fn fire_due_follow_up(&mut self, now: Instant) -> bool {
        if !self.pending.as_ref().is_some_and(|p| p.due <= now) {
            return false;
        }
        let Some(pending) = self.pending.take() else {
            return false;
        };
        tracing::debug!(query = %pending.query, "sending follow-up");
        self.submit_now(&pending.query, pending.tab_ids);
        true
    }

    /// When the armed follow-up is due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Query text of the armed follow-up, if any
    pub fn pending_follow_up(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.query.as_str())
    }

    /// Run the session until `shutdown` fires.
    ///
    /// Shutdown is checked first, then UI commands, then inbound messages.
    /// The inbound stream ending does not stop the loop; UI commands keep
    /// being served. A follow-up still armed at shutdown is dropped.
    pub async fn run<S>(&mut self, mut inbound: S, shutdown: CancellationToken)
    where
        S: Stream<Item = InboundMessage> + Unpin,
    {
        let mut inbound_open = true;
        tracing::debug!("session loop started");

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    if self.pending.take().is_some() {
                        tracing::debug!("shutdown dropped armed follow-up");
                    }
                    break;
                }
                Some(command) = self.commands_rx.recv() => {
                    self.handle_command(command);
                }
                message = inbound.next(), if inbound_open => match message {
                    Some(message) => self.handle_inbound(message),
                    None => {
                        tracing::info!("inbound stream ended");
                        inbound_open = false;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire_due_follow_up(Instant::now());
                }
            }
        }

        tracing::debug!("session loop stopped");
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_connected()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.reconciler.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.reconciler.store().subscribe()
    }

    fn report_disconnected(&mut self) {
        tracing::warn!("port disconnected, query not sent");
        self.reconciler
            .store_mut()
            .add_message(NewMessage::error(DISCONNECTED_MESSAGE));
    }

    fn send(&self, command: OutboundCommand) {
        let kind = command.kind();
        if let Err(e) = self.port.send(command) {
            tracing::warn!(command = kind, error = %e, "failed to send command");
        }
    }
}
