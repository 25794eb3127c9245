//! Composer affordances: tab selector trigger and status texts

/// Decide whether the tab selector should be open after the input changes.
///
/// A trailing `@` opens it when it starts the input or follows a space.
/// Clearing the input, or removing every `@`, closes it.
pub fn tab_selector_trigger(prev_open: bool, new_value: &str) -> bool {
    let mut open = prev_open;
    if !prev_open {
        if let Some(before) = new_value.strip_suffix('@') {
            if before.is_empty() || before.ends_with(' ') {
                open = true;
            }
        }
    }
    if new_value.is_empty() || (prev_open && !new_value.contains('@')) {
        open = false;
    }
    open
}

/// What the composer is currently able to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerStatus {
    Disconnected,
    Processing,
    Idle,
}

impl ComposerStatus {
    /// Derive the status; a disconnected port wins over processing
    pub fn from_flags(connected: bool, processing: bool) -> Self {
        if !connected {
            Self::Disconnected
        } else if processing {
            Self::Processing
        } else {
            Self::Idle
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected...",
            Self::Processing => "Interrupt with new task...",
            Self::Idle => "Ask me anything...",
        }
    }

    /// Keyboard hint shown under the composer
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Disconnected => "Waiting for connection...",
            Self::Processing => "Press Enter to interrupt • Esc to cancel",
            Self::Idle => "Press Enter to send • @ to select tabs",
        }
    }

    /// Label of the submit button for the current input
    pub fn submit_label(&self, input: &str) -> &'static str {
        if *self == Self::Processing && input.trim().is_empty() {
            "Cancel"
        } else {
            "Send"
        }
    }
}
