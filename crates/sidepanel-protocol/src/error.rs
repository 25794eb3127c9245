//! Error types for sidepanel-protocol

use thiserror::Error;

/// Result type alias using sidepanel-protocol Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or delivering port messages
#[derive(Error, Debug)]
pub enum Error {
    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope did not have the expected shape
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The messaging port is not connected
    #[error("Port is disconnected")]
    Disconnected,

    /// The receiving side of the port has gone away
    #[error("Port channel closed")]
    ChannelClosed,
}

impl Error {
    /// Check if this error means the port cannot currently deliver anything
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::Disconnected | Error::ChannelClosed)
    }
}
