//! Settings configuration loaded from TOML files.
//!
//! This module handles non-sensitive configuration stored in TOML format
//! in the XDG config directory (~/.config/haven/config.toml).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# haven configuration file
# Located at: ~/.config/haven/config.toml
#
# This file contains non-sensitive configuration.
# Secrets (API keys) are loaded from environment variables:
#   - GEMINI_API_KEY  (client, backend = "gemini")
#   - QWEN_API_KEY    (gateway server only, never sent to clients)

[gateway]
host = "127.0.0.1"
port = 3000
upstream_url = "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
default_model = "qwen-turbo"
timeout_seconds = 30

[client]
# "gemini" calls the provider directly, "relay" goes through the gateway.
backend = "gemini"
gateway_url = "http://127.0.0.1:3000/api/chat"
image_model = "gemini-2.5-flash-image"
# Text models. When unset, the gemini backend uses "gemini-3-flash-preview"
# and the relay backend lets the gateway pick its default_model.
# chat_model = "gemini-3-flash-preview"
# suggestion_model = "gemini-3-flash-preview"
# summary_model = "gemini-3-flash-preview"

[resilience]
max_attempts = 3
base_delay_ms = 1000
deadline_ms = 60000
# "per_attempt" gives every attempt a fresh deadline, "total" shares one budget.
deadline_mode = "per_attempt"

[diary]
aspect_ratio = "1:1"
recap_chars = 500

[logging]
level = "info"

[prompts]
# Override any prompt here. Persona instructions live under [prompts.personas]:
# [prompts.personas]
# senior = "You are a veteran rail transit signalling engineer..."
"#;

/// Settings loaded from TOML configuration file.
///
/// These are non-sensitive configuration values that can be safely
/// stored on disk and shared.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Credential-hiding gateway settings
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Client-side backend and model selection
    #[serde(default)]
    pub client: ClientSettings,

    /// Retry and deadline settings
    #[serde(default)]
    pub resilience: ResilienceSettings,

    /// Diary synthesis settings
    #[serde(default)]
    pub diary: DiarySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Prompt text sent to the model
    #[serde(default)]
    pub prompts: PromptSettings,
}

/// Gateway server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    /// Host to bind to (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind to (default: 3000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Upstream text-generation endpoint
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Model used when a request does not name one
    #[serde(default = "default_gateway_model")]
    pub default_model: String,

    /// Server-side timeout for the upstream call, independent of client deadlines
    #[serde(default = "default_gateway_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Which backend the client-side services talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Call the Gemini API directly with a local key.
    #[default]
    Gemini,
    /// Call the credential-hiding gateway.
    Relay,
}

/// Client-side configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub backend: Backend,

    /// Gateway chat endpoint used by the relay backend
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Persona chat model (default depends on the backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,

    /// Reply suggestion model (default depends on the backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_model: Option<String>,

    /// Diary summary model (default depends on the backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_model: Option<String>,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Directory holding persisted diaries (defaults to the XDG data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

/// How the executor accounts deadlines across retry attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineMode {
    /// Every attempt gets a fresh deadline.
    #[default]
    PerAttempt,
    /// One deadline covers all attempts and backoff waits.
    Total,
}

/// Retry and deadline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResilienceSettings {
    /// Total attempts including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles afterwards (default: 1000)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Deadline in milliseconds (default: 60000)
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    #[serde(default)]
    pub deadline_mode: DeadlineMode,
}

/// Diary synthesis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiarySettings {
    /// Aspect ratio hint for illustrations (default: "1:1")
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    /// Characters of a conversation transcript kept in the entry recap
    #[serde(default = "default_recap_chars")]
    pub recap_chars: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Prompt text. Every field falls back to a built-in default.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptSettings {
    #[serde(default = "default_suggestion_prompt")]
    pub suggestion: String,

    #[serde(default = "default_summary_prompt")]
    pub summary: String,

    /// Illustration prompt; `{summary}` is replaced with the diary summary.
    #[serde(default = "default_image_prompt")]
    pub image: String,

    /// Used when the model returns an empty summary.
    #[serde(default = "default_fallback_summary")]
    pub fallback_summary: String,

    /// Persona id -> system instruction overrides
    #[serde(default)]
    pub personas: BTreeMap<String, String>,
}

// Default value functions

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_upstream_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation".to_string()
}

fn default_gateway_model() -> String {
    "qwen-turbo".to_string()
}

fn default_gateway_timeout_seconds() -> u64 {
    30
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:3000/api/chat".to_string()
}

fn default_text_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_deadline_ms() -> u64 {
    60_000
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

fn default_recap_chars() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_suggestion_prompt() -> String {
    "You are an experienced, level-headed senior colleague and a warm supporter. \
     Help the user, who is the subordinate, reply to the message they received. \
     Produce two versions: 1. serious and professional, precise wording with clear boundaries; \
     2. warm and lively, friendly with a touch of humour. \
     Output must be a strict JSON array whose objects have the fields \
     title, text, rationalAnalysis, warmSupport. Do not output anything else."
        .to_string()
}

fn default_summary_prompt() -> String {
    "You are a sensitive old friend. Condense the following conversation or note into a \
     mood diary of about 150 words: capture the core emotion of the day (anxiety, fatigue, \
     or relief) and write it gently, like a friend writing down a memory late at night."
        .to_string()
}

fn default_image_prompt() -> String {
    "A soft, healing watercolor illustration, warm pastel colors, no text, inspired by: {summary}"
        .to_string()
}

fn default_fallback_summary() -> String {
    "Today was another day of doing your best.".to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            upstream_url: default_upstream_url(),
            default_model: default_gateway_model(),
            timeout_seconds: default_gateway_timeout_seconds(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gateway_url: default_gateway_url(),
            chat_model: None,
            suggestion_model: None,
            summary_model: None,
            image_model: default_image_model(),
            data_dir: None,
        }
    }
}

impl ClientSettings {
    pub fn chat_model(&self) -> String {
        self.text_model(&self.chat_model)
    }

    pub fn suggestion_model(&self) -> String {
        self.text_model(&self.suggestion_model)
    }

    pub fn summary_model(&self) -> String {
        self.text_model(&self.summary_model)
    }

    /// A configured model wins. Otherwise Gemini gets its default and the
    /// relay gets an empty id, which the gateway replaces with its own default.
    fn text_model(&self, configured: &Option<String>) -> String {
        match (configured, self.backend) {
            (Some(model), _) => model.clone(),
            (None, Backend::Gemini) => default_text_model(),
            (None, Backend::Relay) => String::new(),
        }
    }
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            deadline_ms: default_deadline_ms(),
            deadline_mode: DeadlineMode::default(),
        }
    }
}

impl Default for DiarySettings {
    fn default() -> Self {
        Self {
            aspect_ratio: default_aspect_ratio(),
            recap_chars: default_recap_chars(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            suggestion: default_suggestion_prompt(),
            summary: default_summary_prompt(),
            image: default_image_prompt(),
            fallback_summary: default_fallback_summary(),
            personas: BTreeMap::new(),
        }
    }
}

impl PromptSettings {
    /// Render the illustration prompt for a diary summary.
    pub fn image_prompt(&self, summary: &str) -> String {
        self.image.replace("{summary}", summary)
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    /// The file is located at `~/.config/haven/config.toml`.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Serialize settings to TOML content.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration file path.
    ///
    /// Uses XDG config directory: `~/.config/haven/config.toml`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("HAVEN_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("haven");

        Ok(config_dir.join("config.toml"))
    }

    /// Directory holding persisted diaries.
    ///
    /// `[client] data_dir` wins, then `~/.local/share/haven`.
    pub fn data_dir(&self) -> Result<PathBuf, SettingsError> {
        if let Some(dir) = &self.client.data_dir {
            return Ok(PathBuf::from(dir));
        }

        Ok(dirs::data_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("haven"))
    }

    /// Create the default configuration file.
    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }

    /// Get the HTTP bind address for the gateway.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }
}
