//! Inbound envelopes delivered by the background process

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Envelope type for agent stream updates
pub const AGENT_STREAM_UPDATE: &str = "AGENT_STREAM_UPDATE";

/// Envelope type for workflow status changes
pub const WORKFLOW_STATUS: &str = "WORKFLOW_STATUS";

/// The outer `{ type, payload }` shape shared by every port message.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StreamUpdatePayload {
    #[serde(default)]
    details: Option<StreamDetails>,
}

/// Details of a single agent stream update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDetails {
    /// Kind of update, e.g. `StreamingChunk`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Correlation key of the stream segment this update belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamDetails {
    /// Create details for the given message type
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: Some(message_type.into()),
            ..Default::default()
        }
    }

    /// Set the stream correlation key
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Set the content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the tool name
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Set the error text
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Parsed message kind, if one was given
    pub fn kind(&self) -> Option<MessageKind> {
        self.message_type.as_deref().map(MessageKind::parse)
    }
}

/// Known stream update kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    SystemMessage,
    NewSegment,
    StreamingChunk,
    FinalizeSegment,
    ToolResult,
    ErrorMessage,
    TaskResult,
    CancelMessage,
    /// Anything else (thinking, debug, ...), kept for logging
    Other(String),
}

impl MessageKind {
    /// Parse a wire `messageType` string
    pub fn parse(s: &str) -> Self {
        match s {
            "SystemMessage" => Self::SystemMessage,
            "NewSegment" => Self::NewSegment,
            "StreamingChunk" => Self::StreamingChunk,
            "FinalizeSegment" => Self::FinalizeSegment,
            "ToolResult" => Self::ToolResult,
            "ErrorMessage" => Self::ErrorMessage,
            "TaskResult" => Self::TaskResult,
            "CancelMessage" => Self::CancelMessage,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::SystemMessage => "SystemMessage",
            Self::NewSegment => "NewSegment",
            Self::StreamingChunk => "StreamingChunk",
            Self::FinalizeSegment => "FinalizeSegment",
            Self::ToolResult => "ToolResult",
            Self::ErrorMessage => "ErrorMessage",
            Self::TaskResult => "TaskResult",
            Self::CancelMessage => "CancelMessage",
            Self::Other(s) => s,
        }
    }
}

/// Workflow lifecycle reported by the background process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Payload of a `WORKFLOW_STATUS` message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkflowState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
}

impl WorkflowStatusPayload {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.unwrap_or(false)
    }

    /// Whether this status ends the current task
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            Some(WorkflowState::Completed) | Some(WorkflowState::Failed)
        ) || self.is_cancelled()
    }
}

/// A decoded message received over the port
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `AGENT_STREAM_UPDATE`; `None` when the payload carried no details
    StreamUpdate(Option<StreamDetails>),
    /// `WORKFLOW_STATUS`
    WorkflowStatus(WorkflowStatusPayload),
    /// Any other envelope type; the side panel does not act on these
    Other { kind: String },
}

impl InboundMessage {
    /// Build a stream update message
    pub fn stream(details: StreamDetails) -> Self {
        Self::StreamUpdate(Some(details))
    }

    /// Decode an envelope from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Decode an envelope from an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::MalformedEnvelope(format!(
                "expected an object, got {}",
                value
            )));
        }
        let raw: RawEnvelope = serde_json::from_value(value)?;
        match raw.kind.as_str() {
            AGENT_STREAM_UPDATE => {
                let payload: StreamUpdatePayload = if raw.payload.is_null() {
                    StreamUpdatePayload::default()
                } else {
                    serde_json::from_value(raw.payload)?
                };
                Ok(Self::StreamUpdate(payload.details))
            }
            WORKFLOW_STATUS => {
                let payload: WorkflowStatusPayload = if raw.payload.is_null() {
                    WorkflowStatusPayload::default()
                } else {
                    serde_json::from_value(raw.payload)?
                };
                Ok(Self::WorkflowStatus(payload))
            }
            _ => Ok(Self::Other { kind: raw.kind }),
        }
    }

    /// Encode back into the `{ type, payload }` envelope
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::StreamUpdate(details) => serde_json::json!({
                "type": AGENT_STREAM_UPDATE,
                "payload": { "details": details },
            }),
            Self::WorkflowStatus(payload) => serde_json::json!({
                "type": WORKFLOW_STATUS,
                "payload": payload,
            }),
            Self::Other { kind } => serde_json::json!({ "type": kind }),
        }
    }
}
