//! Outbound control commands sent from the side panel to the background process

use serde::{Deserialize, Serialize};

/// Default `source` tag carried by every command the side panel sends
pub const SOURCE_SIDEPANEL: &str = "sidepanel";

/// Payload of `EXECUTE_QUERY`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQuery {
    pub query: String,
    /// Tabs the user attached as context; omitted when none were selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_ids: Option<Vec<u32>>,
    pub source: String,
}

/// Payload of `CANCEL_TASK`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelTask {
    pub reason: String,
    pub source: String,
}

/// Payload of `RESET_CONVERSATION`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetConversation {
    pub source: String,
}

/// Commands sent over the port. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundCommand {
    ExecuteQuery(ExecuteQuery),
    CancelTask(CancelTask),
    ResetConversation(ResetConversation),
}

impl OutboundCommand {
    /// Create an `EXECUTE_QUERY` command
    pub fn execute_query(
        query: impl Into<String>,
        tab_ids: Option<Vec<u32>>,
        source: impl Into<String>,
    ) -> Self {
        Self::ExecuteQuery(ExecuteQuery {
            query: query.into(),
            tab_ids,
            source: source.into(),
        })
    }

    /// Create a `CANCEL_TASK` command
    pub fn cancel_task(reason: impl Into<String>, source: impl Into<String>) -> Self {
        Self::CancelTask(CancelTask {
            reason: reason.into(),
            source: source.into(),
        })
    }

    /// Create a `RESET_CONVERSATION` command
    pub fn reset_conversation(source: impl Into<String>) -> Self {
        Self::ResetConversation(ResetConversation {
            source: source.into(),
        })
    }

    /// Wire name of this command
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExecuteQuery(_) => "EXECUTE_QUERY",
            Self::CancelTask(_) => "CANCEL_TASK",
            Self::ResetConversation(_) => "RESET_CONVERSATION",
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_query_wire_shape() {
        let cmd = OutboundCommand::execute_query("find prices", Some(vec![4, 9]), SOURCE_SIDEPANEL);
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({
                "type": "EXECUTE_QUERY",
                "payload": { "query": "find prices", "tabIds": [4, 9], "source": "sidepanel" }
            })
        );
    }

    #[test]
    fn test_execute_query_omits_empty_tabs() {
        let cmd = OutboundCommand::execute_query("hi", None, SOURCE_SIDEPANEL);
        let value = serde_json::to_value(&cmd).unwrap();
        assert!(value["payload"].get("tabIds").is_none());
    }

    #[test]
    fn test_cancel_and_reset_wire_shape() {
        let cancel = OutboundCommand::cancel_task("User requested cancellation", "sidepanel");
        assert_eq!(
            serde_json::to_value(&cancel).unwrap(),
            json!({
                "type": "CANCEL_TASK",
                "payload": { "reason": "User requested cancellation", "source": "sidepanel" }
            })
        );

        let reset = OutboundCommand::reset_conversation("sidepanel");
        assert_eq!(
            reset.to_json().unwrap(),
            r#"{"type":"RESET_CONVERSATION","payload":{"source":"sidepanel"}}"#
        );
        assert_eq!(reset.kind(), "RESET_CONVERSATION");
    }

    #[test]
    fn test_decode_command() {
        let cmd: OutboundCommand = serde_json::from_value(json!({
            "type": "CANCEL_TASK",
            "payload": { "reason": "x", "source": "popup" }
        }))
        .unwrap();
        assert_eq!(cmd, OutboundCommand::cancel_task("x", "popup"));
    }
}
