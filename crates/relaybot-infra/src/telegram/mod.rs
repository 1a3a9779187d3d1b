//! Telegram Bot API client.
//!
//! A thin JSON-over-HTTP wrapper around the handful of methods the relay
//! uses: `getMe`, `getUpdates` (long polling), `sendMessage`, and
//! `sendChatAction`. The bot token is embedded in every request URL and is
//! never logged.

pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use self::types::{
    ApiResponse, BotUser, GetUpdatesRequest, SendChatActionRequest, SendMessageRequest, Update,
};

/// Public Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Longest text Telegram accepts in one message, in UTF-16 code units.
pub const MAX_MESSAGE_UTF16_UNITS: usize = 4096;

/// Extra time on top of the long-poll window before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Transport(String),

    #[error("telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("unexpected telegram response: {0}")]
    Decode(String),
}

/// Telegram Bot API client.
///
/// Intentionally does NOT derive Debug to prevent token exposure. Share it
/// behind an `Arc`; the inner `reqwest::Client` is already pooled.
pub struct TelegramClient {
    client: reqwest::Client,
    token: SecretString,
    api_base: String,
}

impl TelegramClient {
    pub fn new(token: SecretString) -> Result<Self, TelegramError> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Client against a custom API base (a local Bot API server, or a test double).
    pub fn with_api_base(token: SecretString, api_base: &str) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TelegramError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base,
            self.token.expose_secret(),
            method
        )
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            // reqwest errors include the URL, which carries the token.
            .map_err(|e| TelegramError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Decode(format!("{method}: {}", e.without_url())))?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code.unwrap_or(i64::from(status.as_u16())),
                description: envelope.description.unwrap_or_default(),
            });
        }
        envelope
            .result
            .ok_or_else(|| TelegramError::Decode(format!("{method}: missing result")))
    }

    /// Identity of the bot owning the token.
    pub async fn get_me(&self) -> Result<BotUser, TelegramError> {
        self.call("getMe", &serde_json::json!({}), Duration::from_secs(15))
            .await
    }

    /// Long-poll for updates with id >= `offset`.
    ///
    /// `timeout_secs` is the server-side wait; the HTTP timeout is padded so
    /// an idle poll ends with an empty batch rather than a client timeout.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message"],
        };
        self.call(
            "getUpdates",
            &body,
            Duration::from_secs(timeout_secs) + POLL_GRACE,
        )
        .await
    }

    /// Send `text` with Markdown formatting, retrying as plain text if
    /// Telegram rejects the markup. Long texts go out in several messages.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        for chunk in split_message(text, MAX_MESSAGE_UTF16_UNITS) {
            let markdown = SendMessageRequest {
                chat_id,
                text: chunk,
                parse_mode: Some("Markdown"),
            };
            match self
                .call::<_, serde_json::Value>("sendMessage", &markdown, Duration::from_secs(30))
                .await
            {
                Ok(_) => {}
                Err(TelegramError::Api { code: 400, description }) => {
                    tracing::debug!(chat_id, %description, "markdown rejected, resending as plain text");
                    let plain = SendMessageRequest {
                        chat_id,
                        text: chunk,
                        parse_mode: None,
                    };
                    self.call::<_, serde_json::Value>("sendMessage", &plain, Duration::from_secs(30))
                        .await?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Show the "typing..." indicator in `chat_id`.
    pub async fn send_typing(&self, chat_id: i64) -> Result<(), TelegramError> {
        let body = SendChatActionRequest {
            chat_id,
            action: "typing",
        };
        self.call::<_, bool>("sendChatAction", &body, Duration::from_secs(10))
            .await
            .map(|_| ())
    }
}

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Split `text` into pieces of at most `max_units` UTF-16 code units,
/// preferring to break after a newline.
///
/// Telegram measures message length in UTF-16, so a character outside the
/// Basic Multilingual Plane (most emoji) counts twice. A piece never splits
/// a character; if not even one fits, it goes out alone.
pub fn split_message(text: &str, max_units: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while utf16_len(rest) > max_units {
        let mut units = 0;
        let mut hard_end = rest.len();
        for (i, c) in rest.char_indices() {
            units += c.len_utf16();
            if units > max_units {
                hard_end = i;
                break;
            }
        }
        if hard_end == 0 {
            hard_end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let end = match rest[..hard_end].rfind('\n') {
            Some(nl) if nl > 0 => nl + 1,
            _ => hard_end,
        };
        chunks.push(&rest[..end]);
        rest = &rest[end..];
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}
