//! Error types for sidepanel-core

use thiserror::Error;

/// Result type alias using sidepanel-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session and its handles
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the port or wire layer
    #[error(transparent)]
    Protocol(#[from] sidepanel_protocol::Error),

    /// The session loop has shut down and no longer accepts commands
    #[error("Session closed")]
    SessionClosed,
}

impl Error {
    /// Check if this error means nothing can currently be delivered
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Protocol(e) => e.is_disconnect(),
            Error::SessionClosed => true,
        }
    }
}
