//! Application state wiring the conversation core to its adapters.
//!
//! AppState holds the loaded config and the one [`TurnOrchestrator`] shared
//! by every front-end. The orchestrator is pinned to the Ollama client built
//! from the `[ollama]` section.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use relaybot_core::chat::orchestrator::{TurnOrchestrator, TurnSettings};
use relaybot_core::chat::store::ConversationStore;
use relaybot_infra::config::load_bot_config;
use relaybot_infra::llm::create_inference_client;
use relaybot_types::config::BotConfig;

/// Shared application state.
pub struct AppState {
    pub config: BotConfig,
    pub orchestrator: Arc<TurnOrchestrator>,
}

impl AppState {
    /// Load config, build the inference client and the conversation store.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_bot_config(config_path)
            .await
            .context("failed to load configuration")?;

        let client = create_inference_client(&config.ollama)
            .context("failed to create inference client")?;
        let store = ConversationStore::from_config(&config.history)?;

        tracing::info!(
            model = %config.ollama.model,
            max_messages = store.max_messages(),
            policy = %store.policy(),
            "conversation core ready"
        );

        let orchestrator = TurnOrchestrator::new(
            Arc::new(store),
            Arc::new(client),
            TurnSettings::from_config(&config),
        );

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
        })
    }
}
