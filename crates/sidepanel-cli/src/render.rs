//! Plain-text rendering of snapshots and outbound commands

use std::fmt::Write;

use chrono::{DateTime, Local};
use sidepanel_core::{ComposerStatus, Message, Role, Snapshot};
use sidepanel_protocol::OutboundCommand;

/// Header for a message: role marker plus label
pub fn message_header(message: &Message) -> String {
    let (prefix, label) = match message.role {
        Role::User => ("▶ ", "You"),
        Role::Assistant => match message.tool_name() {
            Some(tool) => ("⚙ ", tool),
            None => ("◀ ", "Assistant"),
        },
        Role::System if message.is_error() => ("✖ ", "Error"),
        Role::System => ("● ", "System"),
    };
    if message.is_executing() {
        format!("{}{} ▌", prefix, label)
    } else {
        format!("{}{}", prefix, label)
    }
}

/// Local wall-clock time of a message, `HH:MM:SS`
pub fn message_time(message: &Message) -> String {
    DateTime::from_timestamp_millis(message.timestamp)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Render the whole transcript, one header per message and indented content
pub fn render_transcript(snapshot: &Snapshot, with_time: bool) -> String {
    let mut out = String::new();
    for message in &snapshot.messages {
        let header = message_header(message);
        if with_time {
            let _ = writeln!(out, "{}  {}", header, message_time(message));
        } else {
            let _ = writeln!(out, "{}", header);
        }
        for line in message.content.lines() {
            let _ = writeln!(out, "  {}", line);
        }
        out.push('\n');
    }
    out
}

/// One-line summary of the session flags and the composer button
pub fn status_line(snapshot: &Snapshot, connected: bool, draft: &str) -> String {
    let status = ComposerStatus::from_flags(connected, snapshot.is_processing);
    let mut parts = vec![
        format!("[{}]", status.submit_label(draft)),
        status.hint().to_string(),
    ];
    if let Some(error) = &snapshot.error {
        parts.push(format!("error: {}", error));
    }
    if !snapshot.selected_tab_ids.is_empty() {
        let tabs: Vec<_> = snapshot
            .selected_tab_ids
            .iter()
            .map(|id| id.to_string())
            .collect();
        parts.push(format!("tabs: {}", tabs.join(",")));
    }
    parts.join(" | ")
}

/// Render an outbound command as `→ KIND {payload json}`
pub fn render_command(command: &OutboundCommand) -> String {
    let payload = match serde_json::to_value(command) {
        Ok(mut value) => value
            .get_mut("payload")
            .map(|p| p.take().to_string())
            .unwrap_or_default(),
        Err(e) => format!("<unencodable: {}>", e),
    };
    format!("→ {} {}", command.kind(), payload)
}
