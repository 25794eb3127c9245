//! Test doubles

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use sidepanel_protocol::{Error, OutboundCommand, Result};

use crate::port::Port;

/// A port that records every command it accepts
pub(crate) struct RecordingPort {
    sent: Mutex<Vec<OutboundCommand>>,
    connected: AtomicBool,
}

impl RecordingPort {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        })
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub(crate) fn sent(&self) -> Vec<OutboundCommand> {
        self.sent.lock().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<&'static str> {
        self.sent.lock().iter().map(|c| c.kind()).collect()
    }
}

impl Port for RecordingPort {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send(&self, command: OutboundCommand) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        self.sent.lock().push(command);
        Ok(())
    }
}
