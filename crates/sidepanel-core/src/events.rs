//! Typed inbound events

use sidepanel_protocol::{InboundMessage, MessageKind, StreamDetails, WorkflowStatusPayload};

/// Events the reconciler understands, decoded from port messages
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Informational system text
    SystemMessage { content: Option<String> },

    /// A new assistant segment starts streaming
    NewSegment { stream_key: Option<String> },

    /// Partial text for an open segment
    StreamingChunk {
        stream_key: Option<String>,
        content: Option<String>,
    },

    /// A segment completed, optionally with its authoritative full text
    FinalizeSegment {
        stream_key: Option<String>,
        content: Option<String>,
    },

    /// Output of a tool call
    ToolResult {
        tool_name: Option<String>,
        content: Option<String>,
    },

    /// The agent reported an error
    ErrorMessage {
        error: Option<String>,
        content: Option<String>,
    },

    /// The task finished
    TaskResult { content: Option<String> },

    /// The task was cancelled remotely
    CancelMessage { content: Option<String> },

    /// Out-of-band workflow lifecycle change
    WorkflowStatus(WorkflowStatusPayload),

    /// Anything the side panel does not act on
    Ignored { kind: String },
}

impl PanelEvent {
    /// Decode a port message
    pub fn from_inbound(message: InboundMessage) -> Self {
        match message {
            InboundMessage::StreamUpdate(Some(details)) => Self::from_details(details),
            InboundMessage::StreamUpdate(None) => Self::Ignored {
                kind: "AGENT_STREAM_UPDATE without details".to_string(),
            },
            InboundMessage::WorkflowStatus(payload) => Self::WorkflowStatus(payload),
            InboundMessage::Other { kind } => Self::Ignored { kind },
        }
    }

    fn from_details(details: StreamDetails) -> Self {
        let Some(kind) = details.kind() else {
            return Self::Ignored {
                kind: "stream update without messageType".to_string(),
            };
        };
        let StreamDetails {
            message_id,
            tool_name,
            content,
            error,
            ..
        } = details;

        match kind {
            MessageKind::SystemMessage => Self::SystemMessage { content },
            MessageKind::NewSegment => Self::NewSegment {
                stream_key: message_id,
            },
            MessageKind::StreamingChunk => Self::StreamingChunk {
                stream_key: message_id,
                content,
            },
            MessageKind::FinalizeSegment => Self::FinalizeSegment {
                stream_key: message_id,
                content,
            },
            MessageKind::ToolResult => Self::ToolResult { tool_name, content },
            MessageKind::ErrorMessage => Self::ErrorMessage { error, content },
            MessageKind::TaskResult => Self::TaskResult { content },
            MessageKind::CancelMessage => Self::CancelMessage { content },
            MessageKind::Other(kind) => Self::Ignored { kind },
        }
    }

    /// Check if this event ends the current task
    pub fn is_terminal(&self) -> bool {
        match self {
            PanelEvent::ErrorMessage { .. }
            | PanelEvent::TaskResult { .. }
            | PanelEvent::CancelMessage { .. } => true,
            PanelEvent::WorkflowStatus(status) => status.is_terminal(),
            _ => false,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &str {
        match self {
            PanelEvent::SystemMessage { .. } => "SystemMessage",
            PanelEvent::NewSegment { .. } => "NewSegment",
            PanelEvent::StreamingChunk { .. } => "StreamingChunk",
            PanelEvent::FinalizeSegment { .. } => "FinalizeSegment",
            PanelEvent::ToolResult { .. } => "ToolResult",
            PanelEvent::ErrorMessage { .. } => "ErrorMessage",
            PanelEvent::TaskResult { .. } => "TaskResult",
            PanelEvent::CancelMessage { .. } => "CancelMessage",
            PanelEvent::WorkflowStatus(_) => "WorkflowStatus",
            PanelEvent::Ignored { kind } => kind,
        }
    }
}

impl From<InboundMessage> for PanelEvent {
    fn from(message: InboundMessage) -> Self {
        Self::from_inbound(message)
    }
}
