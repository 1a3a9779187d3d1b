//! Inference backend implementations.
//!
//! Contains the concrete implementation of the [`InferenceClient`] trait
//! defined in `relaybot-core` for a local Ollama server.
//!
//! Also provides a client factory ([`create_inference_client`]) that builds
//! the boxed client from the `[ollama]` config section, and a connection test
//! ([`test_inference_connection`]) used by `relaybot check`.
//!
//! [`InferenceClient`]: relaybot_core::llm::provider::InferenceClient

pub mod ollama;

use relaybot_core::llm::box_client::BoxInferenceClient;
use relaybot_types::config::OllamaConfig;
use relaybot_types::llm::{InferenceError, Message};

use self::ollama::OllamaClient;

/// Create a [`BoxInferenceClient`] from the `[ollama]` config section.
///
/// # Errors
///
/// Returns [`InferenceError::Transport`] if the HTTP client cannot be built.
pub fn create_inference_client(config: &OllamaConfig) -> Result<BoxInferenceClient, InferenceError> {
    let client = OllamaClient::new(config)?;
    tracing::debug!(base_url = client.base_url(), model = %config.model, "created ollama client");
    Ok(BoxInferenceClient::new(client))
}

/// Verify the backend end to end: reachability, then a one-message completion.
///
/// Returns the reply so the caller can show that the model answered.
pub async fn test_inference_connection(client: &BoxInferenceClient) -> Result<String, InferenceError> {
    client.health_check().await?;
    client.complete(&[Message::user("Hello")]).await
}
