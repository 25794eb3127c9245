//! A cloneable handle for driving a running session from the presentation layer.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::store::Snapshot;

/// User actions forwarded into the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Submit raw composer input
    Submit(String),
    Cancel,
    Reset,
    SelectTab(u32),
    DeselectTab(u32),
}

/// A cloneable handle onto a [`Session`](crate::Session).
///
/// Commands are queued onto the session loop; reads go through the latest
/// published snapshot. Cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) commands: mpsc::UnboundedSender<UiCommand>,
    pub(crate) snapshots: watch::Receiver<Arc<Snapshot>>,
}

impl SessionHandle {
    /// Queue a command for the session loop
    pub fn send(&self, command: UiCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::SessionClosed)
    }

    pub fn submit(&self, input: impl Into<String>) -> Result<()> {
        self.send(UiCommand::Submit(input.into()))
    }

    pub fn cancel(&self) -> Result<()> {
        self.send(UiCommand::Cancel)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(UiCommand::Reset)
    }

    pub fn select_tab(&self, tab_id: u32) -> Result<()> {
        self.send(UiCommand::SelectTab(tab_id))
    }

    pub fn deselect_tab(&self, tab_id: u32) -> Result<()> {
        self.send(UiCommand::DeselectTab(tab_id))
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// A fresh receiver for snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    ///
    /// Returns immediately if the current snapshot already does.
    pub async fn wait_for(&self, predicate: impl FnMut(&Snapshot) -> bool) -> Result<Arc<Snapshot>> {
        let mut predicate = predicate;
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s.as_ref()))
            .await
            .map_err(|_| Error::SessionClosed)?;
        Ok(snapshot.clone())
    }
}
