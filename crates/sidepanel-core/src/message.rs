//! Transcript message types

use serde::{Deserialize, Serialize};

/// Opaque, transcript-unique message identifier
pub type MessageId = String;

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Display metadata attached to a message. Never drives reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_executing: bool,
}

/// A transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    /// Full current text; streaming updates replace it wholesale
    pub content: String,
    /// Creation time in Unix milliseconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Whether this message reports an error
    pub fn is_error(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.error)
    }

    /// Name of the tool that produced this message, if any
    pub fn tool_name(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.tool_name.as_deref())
    }

    pub fn is_executing(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.is_executing)
    }
}

/// The caller-supplied part of a message; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub metadata: Option<MessageMetadata>,
}

impl NewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a system message flagged as an error
    pub fn error(content: impl Into<String>) -> Self {
        Self::system(content).with_metadata(MessageMetadata {
            error: true,
            ..Default::default()
        })
    }

    /// Create an assistant message carrying a tool's output
    pub fn tool_result(tool_name: Option<String>, content: impl Into<String>) -> Self {
        Self::assistant(content).with_metadata(MessageMetadata {
            tool_name,
            ..Default::default()
        })
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
