//! Replay scripts: JSONL files of panel steps driven through a real session

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sidepanel_core::{
    ChannelPort, Session, SessionConfig, Snapshot, SubmitOutcome, tab_selector_trigger,
};
use sidepanel_protocol::{InboundMessage, OutboundCommand};
use tokio::time::{Instant, sleep_until};

/// One line of a replay script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Deliver a raw `{ type, payload }` envelope from the background
    Inbound { message: Value },
    /// Replace the composer draft without sending it
    Type { text: String },
    /// Type `text` into the composer and press Enter
    Submit { text: String },
    Cancel,
    Reset,
    SelectTab { tab_id: u32 },
    DeselectTab { tab_id: u32 },
    /// Let time pass; an armed follow-up fires if it comes due
    WaitMs { ms: u64 },
    /// Flip the port connection
    Connected { value: bool },
    /// Mark the latest result of `tool_name` as running or done
    ToolExecuting { tool_name: String, executing: bool },
}

/// Parse a JSONL script. Blank lines and lines starting with `#` are skipped.
pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step = serde_json::from_str(line)
            .with_context(|| format!("invalid step on line {}", index + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

/// Everything a replay produced
#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub snapshot: Arc<Snapshot>,
    pub commands: Vec<OutboundCommand>,
    /// Follow-up still armed when the script ran out
    pub pending_follow_up: Option<String>,
    pub connected: bool,
    /// Unsent composer text
    pub draft: String,
    pub tab_selector_open: bool,
}

/// Run `steps` against a fresh session
pub async fn replay(steps: &[ScriptStep], config: SessionConfig) -> ReplayOutput {
    let (port, mut outbound) = ChannelPort::new();
    let mut session = Session::with_config(Arc::new(port.clone()), config);
    let mut draft = String::new();
    let mut tab_selector_open = false;

    for (index, step) in steps.iter().enumerate() {
        tracing::debug!(position = index + 1, ?step, "replaying");
        match step {
            ScriptStep::Inbound { message } => match InboundMessage::from_value(message.clone()) {
                Ok(message) => session.handle_inbound(message),
                Err(e) => {
                    tracing::debug!(position = index + 1, error = %e, "skipping malformed envelope")
                }
            },
            ScriptStep::Type { text } => {
                tab_selector_open = tab_selector_trigger(tab_selector_open, text);
                draft = text.clone();
            }
            ScriptStep::Submit { text } => {
                if session.submit(text) == SubmitOutcome::Ignored {
                    tracing::debug!(position = index + 1, "blank submit ignored");
                } else {
                    draft.clear();
                    tab_selector_open = false;
                }
            }
            ScriptStep::Cancel => session.cancel(),
            ScriptStep::Reset => session.reset(),
            ScriptStep::SelectTab { tab_id } => session.select_tab(*tab_id),
            ScriptStep::DeselectTab { tab_id } => session.deselect_tab(*tab_id),
            ScriptStep::WaitMs { ms } => wait(&mut session, Duration::from_millis(*ms)).await,
            ScriptStep::Connected { value } => port.set_connected(*value),
            ScriptStep::ToolExecuting {
                tool_name,
                executing,
            } => {
                let snapshot = session.snapshot();
                match snapshot
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.tool_name() == Some(tool_name.as_str()))
                {
                    Some(message) => {
                        session.set_executing(&message.id, *executing);
                    }
                    None => {
                        tracing::debug!(position = index + 1, tool = %tool_name, "no result for tool")
                    }
                }
            }
        }
    }

    let pending_follow_up = session.pending_follow_up().map(str::to_string);
    if let Some(query) = &pending_follow_up {
        tracing::info!(query = %query, "script ended with an armed follow-up");
    }

    let mut commands = Vec::new();
    while let Ok(command) = outbound.try_recv() {
        commands.push(command);
    }

    ReplayOutput {
        snapshot: session.snapshot(),
        commands,
        pending_follow_up,
        connected: session.is_connected(),
        draft,
        tab_selector_open,
    }
}

async fn wait(session: &mut Session, duration: Duration) {
    let until = Instant::now() + duration;
    while let Some(deadline) = session.next_deadline().filter(|d| *d <= until) {
        sleep_until(deadline).await;
        session.fire_due_follow_up(Instant::now());
    }
    sleep_until(until).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sidepanel_core::Role;

    fn stream(details: Value) -> ScriptStep {
        ScriptStep::Inbound {
            message: json!({ "type": "AGENT_STREAM_UPDATE", "payload": { "details": details } }),
        }
    }

    #[test]
    fn test_parse_script_skips_comments() {
        let text = r#"
# a comment
{"step":"submit","text":"hello"}

{"step":"wait_ms","ms":300}
{"step":"connected","value":false}
{"step":"cancel"}
"#;
        let steps = parse_script(text).unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptStep::Submit {
                    text: "hello".into()
                },
                ScriptStep::WaitMs { ms: 300 },
                ScriptStep::Connected { value: false },
                ScriptStep::Cancel,
            ]
        );
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("{\"step\":\"cancel\"}\n{\"step\":\"nope\"}").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_streamed_answer() {
        let steps = vec![
            ScriptStep::SelectTab { tab_id: 12 },
            ScriptStep::Submit {
                text: "what is on this page?".into(),
            },
            stream(json!({ "messageType": "NewSegment", "messageId": "s1" })),
            stream(json!({ "messageType": "StreamingChunk", "messageId": "s1", "content": "A " })),
            stream(json!({ "messageType": "StreamingChunk", "messageId": "s1", "content": "recipe" })),
            stream(json!({ "messageType": "FinalizeSegment", "messageId": "s1" })),
            ScriptStep::Inbound {
                message: json!({ "type": "WORKFLOW_STATUS", "payload": { "status": "completed" } }),
            },
        ];

        let output = replay(&steps, SessionConfig::default()).await;
        let snapshot = &output.snapshot;
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[1].role, Role::Assistant);
        assert_eq!(snapshot.messages[1].content, "A recipe");

        assert_eq!(output.commands.len(), 1);
        let json = serde_json::to_value(&output.commands[0]).unwrap();
        assert_eq!(json["payload"]["tabIds"], json!([12]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_interrupt_fires_during_wait() {
        let steps = vec![
            ScriptStep::Submit {
                text: "first".into(),
            },
            ScriptStep::Submit {
                text: "second".into(),
            },
            ScriptStep::WaitMs { ms: 100 },
            stream(json!({ "messageType": "CancelMessage", "content": "Task cancelled" })),
            ScriptStep::WaitMs { ms: 250 },
        ];

        let output = replay(&steps, SessionConfig::default()).await;
        let kinds: Vec<_> = output.commands.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec!["EXECUTE_QUERY", "CANCEL_TASK", "EXECUTE_QUERY"]);
        assert!(output.snapshot.is_processing);
        assert_eq!(output.pending_follow_up, None);
        assert_eq!(
            output.snapshot.last_message().map(|m| m.content.as_str()),
            Some("second")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_reports_unfired_follow_up() {
        let steps = vec![
            ScriptStep::Submit {
                text: "first".into(),
            },
            ScriptStep::Submit {
                text: "second".into(),
            },
        ];
        let output = replay(&steps, SessionConfig::default()).await;
        assert_eq!(output.pending_follow_up.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_replay_composer_and_tool_state() {
        let steps = vec![
            ScriptStep::Type { text: "@".into() },
            ScriptStep::Type {
                text: "@docs".into(),
            },
            stream(json!({ "messageType": "ToolResult", "toolName": "scroll_tool", "content": "Scrolled" })),
            ScriptStep::ToolExecuting {
                tool_name: "scroll_tool".into(),
                executing: true,
            },
            ScriptStep::ToolExecuting {
                tool_name: "missing_tool".into(),
                executing: true,
            },
        ];
        let output = replay(&steps, SessionConfig::default()).await;
        assert_eq!(output.draft, "@docs");
        assert!(output.tab_selector_open);
        assert!(output.snapshot.messages[0].is_executing());

        let steps = vec![
            ScriptStep::Type { text: "@".into() },
            ScriptStep::Submit {
                text: "go".into(),
            },
        ];
        let output = replay(&steps, SessionConfig::default()).await;
        assert_eq!(output.draft, "");
        assert!(!output.tab_selector_open);
    }

    #[tokio::test]
    async fn test_replay_disconnected_and_malformed() {
        let steps = vec![
            ScriptStep::Inbound {
                message: json!("not an envelope"),
            },
            ScriptStep::Connected { value: false },
            ScriptStep::Submit {
                text: "hello".into(),
            },
        ];
        let output = replay(&steps, SessionConfig::default()).await;
        assert!(output.commands.is_empty());
        assert!(!output.connected);
        assert_eq!(output.snapshot.messages.len(), 1);
        assert!(output.snapshot.messages[0].is_error());
    }
}
