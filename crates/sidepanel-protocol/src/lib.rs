//! sidepanel-protocol: wire types for the side panel messaging port
//!
//! This crate defines the JSON envelopes exchanged between the side panel and
//! the background agent process, plus the markdown formatting applied to raw
//! tool outputs before they are shown in the transcript.

pub mod command;
pub mod envelope;
pub mod error;
pub mod format;

pub use command::{CancelTask, ExecuteQuery, OutboundCommand, ResetConversation, SOURCE_SIDEPANEL};
pub use envelope::{
    InboundMessage, MessageKind, StreamDetails, WorkflowState, WorkflowStatusPayload,
};
pub use error::{Error, Result};
pub use format::{ToolOutcome, format_tool_output};
