//! Configuration file support

use serde::{Deserialize, Serialize};
use sidepanel_core::{DEFAULT_INTERRUPT_GRACE, DEFAULT_PLACEHOLDER, SessionConfig};
use sidepanel_protocol::SOURCE_SIDEPANEL;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the sidepanel tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delay between an interrupting cancel and the follow-up query
    pub interrupt_grace_ms: u64,
    /// `source` tag on outbound commands
    pub source: String,
    /// Text shown while a segment waits for its first chunk
    pub placeholder: String,
    /// tracing filter directive, e.g. "sidepanel_core=debug"
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interrupt_grace_ms: DEFAULT_INTERRUPT_GRACE.as_millis() as u64,
            source: SOURCE_SIDEPANEL.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            log_filter: None,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sidepanel")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SIDEPANEL_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from `path`, falling back to defaults when missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init(path: &Path) -> std::io::Result<PathBuf> {
        if !path.exists() {
            Self::default().save_to(path)?;
        }
        Ok(path.to_path_buf())
    }

    /// Session settings derived from this config
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            interrupt_grace: Duration::from_millis(self.interrupt_grace_ms),
            source: self.source.clone(),
            placeholder: self.placeholder.clone(),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# sidepanel configuration file
# Place at ~/.config/sidepanel/config.toml (Linux/Mac) or %APPDATA%\sidepanel\config.toml (Windows)
# or point SIDEPANEL_CONFIG_PATH at it

# Milliseconds between an interrupting cancel and the follow-up query
interrupt_grace_ms = 300

# Source tag sent with every command
source = "sidepanel"

# Placeholder shown while a response segment waits for its first chunk
placeholder = "..."

# Log filter (optional), same syntax as RUST_LOG
# log_filter = "sidepanel_core=debug"
"#
}
