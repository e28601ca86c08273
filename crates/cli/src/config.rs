//! Configuration loading from relay.toml.

use std::path::Path;
use std::time::Duration;

use runtime::providers::{DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use runtime::{DEFAULT_MAX_ROUNDS, DEFAULT_STARTUP_TIMEOUT, Launchers, LoopOptions};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "relay.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub conversation: ConversationConfig,
    /// Commands used to start provider scripts.
    pub launchers: Launchers,
}

/// Model backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model to use.
    pub id: String,

    /// Anthropic API key. Falls back to `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,

    pub max_tokens: u32,
    pub base_url: String,

    /// Per-request timeout in seconds. Unset waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

/// Conversation loop and provider settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_rounds: usize,
    pub tool_timeout_secs: Option<u64>,
    pub startup_timeout_secs: u64,
    /// Print each tool result ahead of the answer.
    pub show_tool_results: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            tool_timeout_secs: None,
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT.as_secs(),
            show_tool_results: true,
        }
    }
}

impl ConversationConfig {
    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            max_rounds: self.max_rounds,
            tool_timeout: self.tool_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if given, else `relay.toml` when it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (`RELAY_MODEL`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("RELAY_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model.id = model;
        }
    }

    /// The model API key: `model.api_key`, else `ANTHROPIC_API_KEY`.
    pub fn api_key(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        self.model
            .api_key
            .clone()
            .or_else(|| lookup("ANTHROPIC_API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversation.max_rounds == 0 {
            return Err(ConfigError::Invalid(
                "conversation.max_rounds must be at least 1".into(),
            ));
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::Invalid("model.max_tokens must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("no API key: set ANTHROPIC_API_KEY or model.api_key")]
    MissingApiKey,
}
