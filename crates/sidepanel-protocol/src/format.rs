//! Markdown rendering of raw tool outputs
//!
//! Tools report `{ ok, output, error }`. The shape of `output` depends on the
//! tool; anything this module does not recognise falls back to a pretty-printed
//! JSON code block.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw result reported by a browser tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(output: Value) -> Self {
        Self {
            ok: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Format a tool result as markdown for the transcript.
pub fn format_tool_output(tool_name: &str, result: &ToolOutcome) -> String {
    if !result.ok {
        let message = result
            .error
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or("Unknown error occurred");
        return format!("❌ Error in {}: {}", tool_name, message);
    }

    let output = match result.output.as_ref() {
        Some(output) if truthy(Some(output)) => output,
        _ => return "No output available.".to_string(),
    };

    match tool_name {
        "planner_tool" => format_plan(output),
        "tab_operations_tool" => format_open_tabs(output),
        "validator_tool" => format_validation(output),
        "navigation_tool" => "#### 🧭 Navigation".to_string(),
        "find_element_tool" => format_elements(output),
        "classification_tool" => {
            let task_type = if truthy(output.get("is_simple_task")) {
                "Simple"
            } else {
                "Complex"
            };
            format!("#### 🏷️ Task Classification\n\n**Type:** {} Task", task_type)
        }
        "interaction_tool" => format_interaction(output),
        "scroll_tool" => format_scroll(output),
        "search_tool" => format_search(output),
        "refresh_browser_state" | "refresh_state_tool" => {
            "#### 🔄 Browser State Refreshed\n\nCurrent page state has been captured and updated."
                .to_string()
        }
        "group_tabs_tool" => format_tab_groups(output),
        "done_tool" => format_done(output),
        "todo_manager" => match output {
            Value::String(s) => s.clone(),
            other => json_block(other),
        },
        "get_selected_tabs_tool" => format_selected_tabs(output),
        _ => json_block(output),
    }
}

fn format_plan(output: &Value) -> String {
    let Some(steps) = output.get("steps").and_then(Value::as_array) else {
        return json_block(output);
    };
    let mut md = String::from("#### 📋 Execution Plan\n\n");
    for (idx, step) in steps.iter().enumerate() {
        md.push_str(&format!("**Step {}:** {}\n", idx + 1, text_field(step, "action")));
        if truthy(step.get("reasoning")) {
            md.push_str(&format!("*Reasoning:* {}\n", text_field(step, "reasoning")));
        }
        md.push('\n');
    }
    md.trim().to_string()
}

fn format_open_tabs(output: &Value) -> String {
    // Tab operations report a JSON-encoded array
    let parsed;
    let tabs = match output {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(_) => return s.clone(),
        },
        other => other,
    };

    let Some(tabs) = tabs.as_array() else {
        return json_block(tabs);
    };
    if tabs.is_empty() {
        return "#### 📑 No Open Tabs".to_string();
    }

    let mut md = format!("#### 📑 Open Tabs ({})\n\n", tabs.len());
    md.push_str("| ID | Title | URL |\n| -- | ----- | --- |\n");
    push_tab_rows(&mut md, tabs);
    md.trim().to_string()
}

fn format_validation(output: &Value) -> String {
    let mut md = String::from("#### ✅ Validation Result\n\n");
    let complete = if truthy(output.get("isComplete")) {
        "Yes ✓"
    } else {
        "No ✗"
    };
    md.push_str(&format!("**Complete?** {}\n\n", complete));
    if truthy(output.get("reasoning")) {
        md.push_str(&format!("**Reasoning:** {}\n\n", text_field(output, "reasoning")));
    }
    if let Some(suggestions) = output.get("suggestions").and_then(Value::as_array) {
        if !suggestions.is_empty() {
            md.push_str("**Suggestions:**\n");
            for suggestion in suggestions {
                md.push_str(&format!("- {}\n", text(suggestion)));
            }
        }
    }
    md.trim().to_string()
}

fn format_elements(output: &Value) -> String {
    let Some(elements) = output.get("elements").and_then(Value::as_array) else {
        return json_block(output);
    };
    if elements.is_empty() {
        return "#### 🔍 No Elements Found".to_string();
    }

    let plural = if elements.len() > 1 { "s" } else { "" };
    let mut md = format!("#### 🔍 Found {} Element{}\n\n", elements.len(), plural);
    for (idx, el) in elements.iter().enumerate() {
        md.push_str(&format!("**Element {}:**\n", idx + 1));
        if truthy(el.get("selector")) {
            md.push_str(&format!("- Selector: `{}`\n", text_field(el, "selector")));
        }
        if truthy(el.get("text")) {
            md.push_str(&format!("- Text: \"{}\"\n", text_field(el, "text")));
        }
        if let Some(pos) = el.get("position").filter(|p| truthy(Some(*p))) {
            md.push_str(&format!(
                "- Position: ({}, {})\n",
                text_field(pos, "x"),
                text_field(pos, "y")
            ));
        }
        md.push('\n');
    }
    md.trim().to_string()
}

fn format_interaction(output: &Value) -> String {
    let mut md = String::from("#### 🖱️ Interaction\n\n");
    if truthy(output.get("action")) {
        md.push_str(&format!("**Action:** {}\n", text_field(output, "action")));
    }
    if truthy(output.get("element")) {
        md.push_str(&format!("**Element:** {}\n", text_field(output, "element")));
    }
    md.push_str(&format!("**Status:** {}", status_text(output)));
    md.trim().to_string()
}

fn format_scroll(output: &Value) -> String {
    let mut md = String::from("#### 📜 Scroll\n\n");
    if truthy(output.get("direction")) {
        md.push_str(&format!("**Direction:** {}\n", text_field(output, "direction")));
    }
    if output.get("amount").is_some_and(|a| !a.is_null()) {
        md.push_str(&format!("**Amount:** {}px\n", text_field(output, "amount")));
    }
    md.push_str(&format!("**Status:** {}", status_text(output)));
    md.trim().to_string()
}

fn format_search(output: &Value) -> String {
    if let Value::String(s) = output {
        return s.clone();
    }
    let Some(matches) = output.get("matches").and_then(Value::as_array) else {
        return json_block(output);
    };

    let mut md = String::from("🔎 Search Results\n\n");
    if truthy(output.get("query")) {
        md.push_str(&format!("**Query:** \"{}\"\n\n", text_field(output, "query")));
    }
    if matches.is_empty() {
        md.push_str("*No matches found*");
    } else {
        let plural = if matches.len() > 1 { "es" } else { "" };
        md.push_str(&format!("**Found {} match{}:**\n\n", matches.len(), plural));
        for (i, m) in matches.iter().enumerate() {
            md.push_str(&format!("{}. \"{}\"\n", i + 1, text_field(m, "text")));
            if truthy(m.get("selector")) {
                md.push_str(&format!("   Selector: `{}`\n", text_field(m, "selector")));
            }
        }
    }
    md.trim().to_string()
}

fn format_tab_groups(output: &Value) -> String {
    if let Value::String(s) = output {
        return if s.starts_with("Navigated") {
            format!("🚀 {}", s)
        } else {
            format!("✅ {}", s)
        };
    }
    let Some(groups) = output.get("groups").and_then(Value::as_array) else {
        return json_block(output);
    };
    if groups.is_empty() {
        return "#### 📁 No Tab Groups".to_string();
    }

    let mut md = String::from("#### 📁 Tab Groups\n\n");
    for group in groups {
        md.push_str(&format!("**{}**\n", text_or(group.get("name"), "Unnamed Group")));
        if let Some(tabs) = group.get("tabs").and_then(Value::as_array) {
            for tab in tabs {
                md.push_str(&format!("- {}\n", text_or(tab.get("title"), "Untitled")));
            }
        }
        md.push('\n');
    }
    md.trim().to_string()
}

fn format_done(output: &Value) -> String {
    let mut md = String::from("#### 🎉 Task Complete\n\n");
    if truthy(output.get("message")) {
        md.push_str(&text_field(output, "message"));
    } else if truthy(output.get("status")) {
        md.push_str(&format!("Status: {}", text_field(output, "status")));
    } else {
        md.push_str("The task has been completed successfully.");
    }
    md
}

fn format_selected_tabs(output: &Value) -> String {
    if let Value::String(s) = output {
        return s.clone();
    }
    let Some(tabs) = output.as_array() else {
        return json_block(output);
    };
    if tabs.is_empty() {
        return "📑 No Tabs Open".to_string();
    }

    let mut md = String::from("📑 Selected Tabs\n\n");
    md.push_str("| ID | Title | URL |\n");
    md.push_str("| -- | ----- | --- |\n");
    push_tab_rows(&mut md, tabs);
    md.trim().to_string()
}

fn push_tab_rows(md: &mut String, tabs: &[Value]) {
    for tab in tabs {
        let title = text_or(tab.get("title"), "Untitled");
        let url = text_or(tab.get("url"), "");
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            text_field(tab, "id"),
            truncate_display(&title, 50),
            truncate_display(&url, 60)
        ));
    }
}

fn status_text(output: &Value) -> &'static str {
    if truthy(output.get("success")) {
        "✓ Success"
    } else {
        "✗ Failed"
    }
}

/// Shorten `s` to `max` chars, ending in "..." when it had to be cut.
fn truncate_display(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn json_block(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("```json\n{}\n```", pretty)
}

/// JavaScript-style truthiness, which is what the tools' producers rely on.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn text_field(value: &Value, key: &str) -> String {
    value.get(key).map(text).unwrap_or_default()
}

fn text_or(value: Option<&Value>, fallback: &str) -> String {
    if truthy(value) {
        value.map(text).unwrap_or_default()
    } else {
        fallback.to_string()
    }
}
