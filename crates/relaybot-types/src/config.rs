//! Configuration types for relaybot.
//!
//! `BotConfig` represents the top-level `relaybot.toml`: Telegram credentials,
//! the Ollama endpoint, the history bound and trim policy, and the fixed
//! user-facing replies. Everything except the Telegram credentials and the
//! Ollama model has a default.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::chat::TrimPolicy;
use crate::error::ConfigError;

/// Directive pinned at the head of every new conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are MathBot, a patient math tutor. \
Answer math questions step by step, keep explanations short, and say so \
when a question is not about mathematics.";

/// Reply sent when the inference backend fails or times out.
pub const DEFAULT_FAILURE_NOTICE: &str =
    "Sorry, I couldn't reach the model right now. Please try again in a moment.";

/// Reply sent after a session history is cleared.
pub const DEFAULT_RESET_CONFIRMATION: &str = "History cleared!";

/// Top-level configuration for the relay bot.
#[derive(Debug, Default, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    pub ollama: OllamaConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub replies: ReplyConfig,
}

impl BotConfig {
    /// Check the settings every front-end depends on.
    ///
    /// Telegram credentials are checked separately by
    /// [`TelegramConfig::validate`] since the local REPL runs without them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.history.validate()?;
        Ok(())
    }
}

/// Telegram Bot API credentials and polling settings.
#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather. Never logged.
    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    pub token: SecretString,

    /// Bot username, used to strip `@username` suffixes from commands.
    #[serde(default)]
    pub username: String,

    /// Server-side long-poll timeout for `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl TelegramConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingField("telegram.token"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField("telegram.username"));
        }
        if self.poll_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("telegram.poll_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: empty_secret(),
            username: String::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// Ollama inference endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub model: String,

    /// Upper bound on one completion round-trip.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("ollama.base_url"));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingField("ollama.model"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("ollama.request_timeout_secs"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("ollama.connect_timeout_secs"));
        }
        Ok(())
    }
}

/// Per-session history bound and eviction rule.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    #[serde(default)]
    pub trim_policy: TrimPolicy,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_messages < 2 {
            return Err(ConfigError::HistoryBoundTooSmall(self.max_messages));
        }
        Ok(())
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            trim_policy: TrimPolicy::default(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Fixed user-facing replies, overridable for localization.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_failure_notice")]
    pub failure_notice: String,

    #[serde(default = "default_reset_confirmation")]
    pub reset_confirmation: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            failure_notice: default_failure_notice(),
            reset_confirmation: default_reset_confirmation(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_max_messages() -> usize {
    20
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_failure_notice() -> String {
    DEFAULT_FAILURE_NOTICE.to_string()
}

fn default_reset_confirmation() -> String {
    DEFAULT_RESET_CONFIRMATION.to_string()
}
