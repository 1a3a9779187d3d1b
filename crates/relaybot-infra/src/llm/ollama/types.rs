//! Ollama chat API types.
//!
//! Request/response structures for `POST /api/chat`. They are NOT the
//! generic message types from relaybot-types -- those are backend-agnostic.

use serde::{Deserialize, Serialize};

use relaybot_types::llm::{Message, MessageRole};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    /// Always `false`: the relay sends one complete reply per turn.
    pub stream: bool,
}

/// A single message in an Ollama conversation.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Non-streaming response from `POST /api/chat`.
///
/// Every field is optional so a structurally odd body still parses and the
/// client can report exactly what was missing. Fields the relay never reads
/// (`model`, `created_at`, timings, the reply role) are left to serde to skip.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    pub message: Option<OllamaResponseMessage>,
    #[serde(default)]
    pub done: bool,
}

/// The assistant message inside a chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaResponseMessage {
    pub content: Option<String>,
}

impl OllamaChatResponse {
    /// The reply text, if the response carried one.
    pub fn into_content(self) -> Option<String> {
        self.message.and_then(|m| m.content)
    }
}
