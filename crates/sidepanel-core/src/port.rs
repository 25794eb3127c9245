//! The messaging port seam between the panel and the background process

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use sidepanel_protocol::{Error, OutboundCommand, Result};
use tokio::sync::mpsc;

/// Outbound half of the messaging port.
///
/// Delivery is fire-and-forget: a successful `send` only means the command
/// was handed off, not that anything acted on it.
pub trait Port: Send + Sync {
    /// Whether the port can currently deliver commands
    fn is_connected(&self) -> bool;

    /// Hand a command to the port
    fn send(&self, command: OutboundCommand) -> Result<()>;
}

/// A [`Port`] backed by an unbounded channel, with a switchable connection flag.
#[derive(Clone)]
pub struct ChannelPort {
    tx: mpsc::UnboundedSender<OutboundCommand>,
    connected: Arc<AtomicBool>,
}

impl ChannelPort {
    /// Create a connected port and the receiver its commands arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let port = Self {
            tx,
            connected: Arc::new(AtomicBool::new(true)),
        };
        (port, rx)
    }

    /// Flip the connection flag. Clones share the flag.
    pub fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::AcqRel);
        if was != connected {
            tracing::info!(connected, "port connection changed");
        }
    }
}

impl Port for ChannelPort {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send(&self, command: OutboundCommand) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        tracing::debug!(command = command.kind(), "sending command");
        self.tx.send(command).map_err(|_| Error::ChannelClosed)
    }
}
