//! Turn orchestrator: one inbound user message -> one model round-trip.
//!
//! Sequence per turn:
//! 1. Pin the system directive (no-op when already present)
//! 2. Snapshot the history
//! 3. Record the user message
//! 4. Call the inference client with snapshot + user message
//! 5. Record and return the reply, or return the failure notice
//!
//! The user message is recorded before the model call, so an interrupted or
//! failed turn leaves an unanswered user message in history rather than
//! losing it.
//!
//! Turns for one session never overlap: each turn holds that session's turn
//! lock from step 1 to step 5. Turns for different sessions run in parallel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use relaybot_types::chat::SessionKey;
use relaybot_types::config::{BotConfig, ReplyConfig};
use relaybot_types::llm::{InferenceError, Message};

use crate::llm::box_client::BoxInferenceClient;

use super::store::ConversationStore;

/// Static per-process settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Directive pinned at the head of every session.
    pub system_prompt: String,
    /// Upper bound on one inference call.
    pub inference_timeout: Duration,
    pub replies: ReplyConfig,
}

impl TurnSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            system_prompt: config.history.system_prompt.clone(),
            inference_timeout: Duration::from_secs(config.ollama.request_timeout_secs),
            replies: config.replies.clone(),
        }
    }
}

/// Sequences user turns through the conversation store and inference client.
pub struct TurnOrchestrator {
    store: Arc<ConversationStore>,
    client: Arc<BoxInferenceClient>,
    settings: TurnSettings,
    turn_locks: DashMap<SessionKey, Arc<Mutex<()>>>,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        client: Arc<BoxInferenceClient>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            store,
            client,
            settings,
            turn_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn client(&self) -> &BoxInferenceClient {
        &self.client
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Run one user turn and return the text to deliver back to the session.
    ///
    /// Never fails: inference errors are logged and answered with the
    /// configured failure notice.
    pub async fn handle_user_turn(&self, key: &SessionKey, user_text: &str) -> String {
        let lock = self.turn_lock(key);
        let _turn = lock.lock().await;

        self.store
            .ensure_system_prompt(key, &self.settings.system_prompt);
        let mut messages = self.store.get_history(key);
        self.store.append_user(key, user_text);
        messages.push(Message::user(user_text));

        debug!(session = %key, messages = messages.len(), model = self.client.model(), "requesting completion");

        match self.complete_with_timeout(&messages).await {
            Ok(reply) => {
                self.store.append_assistant(key, &reply);
                info!(session = %key, reply_chars = reply.len(), "turn completed");
                reply
            }
            Err(e) => {
                warn!(session = %key, error = %e, timeout = e.is_timeout(), "inference failed, user turn kept without reply");
                self.settings.replies.failure_notice.clone()
            }
        }
    }

    /// Clear the session's history and return the confirmation reply.
    ///
    /// Waits for any in-flight turn of the same session to finish first.
    pub async fn reset(&self, key: &SessionKey) -> String {
        let lock = self.turn_lock(key);
        let turn = lock.lock().await;

        self.store.reset(key);
        // Drop the lock entry too unless another turn already holds a clone.
        self.turn_locks.remove_if(key, |_, held| {
            Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2
        });
        drop(turn);
        info!(session = %key, "session reset");
        self.settings.replies.reset_confirmation.clone()
    }

    /// Check the inference backend and describe the result for a user.
    pub async fn check_inference(&self) -> String {
        let outcome = tokio::time::timeout(
            self.settings.inference_timeout,
            self.client.health_check(),
        )
        .await
        .unwrap_or(Err(InferenceError::Timeout(self.settings.inference_timeout)));

        match outcome {
            Ok(()) => format!(
                "{} connected!\nModel: {}",
                self.client.name(),
                self.client.model()
            ),
            Err(e) => {
                warn!(error = %e, "inference health check failed");
                format!("{} is not reachable: {e}", self.client.name())
            }
        }
    }

    async fn complete_with_timeout(&self, messages: &[Message]) -> Result<String, InferenceError> {
        let timeout = self.settings.inference_timeout;
        tokio::time::timeout(timeout, self.client.complete(messages))
            .await
            .unwrap_or(Err(InferenceError::Timeout(timeout)))
    }

    fn turn_lock(&self, key: &SessionKey) -> Arc<Mutex<()>> {
        // Clone the Arc out so the DashMap guard is dropped before awaiting.
        self.turn_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
