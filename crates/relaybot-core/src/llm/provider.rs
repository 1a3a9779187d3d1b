//! InferenceClient trait definition.
//!
//! This is the core abstraction every inference backend implements. Uses
//! RPITIT for the async methods; see [`super::box_client`] for the
//! object-safe wrapper.

use relaybot_types::llm::{InferenceError, Message};

/// Trait for inference backends (Ollama, test doubles, ...).
///
/// Implementations are stateless from the core's point of view: the same
/// client is shared across every session and called concurrently, so no
/// per-connection locking happens here.
///
/// Implementations live in relaybot-infra (e.g., `OllamaClient`).
pub trait InferenceClient: Send + Sync {
    /// Human-readable backend name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Request a completion for the role-tagged message sequence and return
    /// the reply text.
    fn complete(
        &self,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<String, InferenceError>> + Send;

    /// Cheap reachability check that does not run the model.
    fn health_check(
        &self,
    ) -> impl std::future::Future<Output = Result<(), InferenceError>> + Send;
}
