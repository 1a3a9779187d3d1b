//! Conversation state and turn orchestration for relaybot.
//!
//! This crate defines the conversation store, the turn orchestrator, the
//! per-session dispatcher, and the `InferenceClient` port that the
//! infrastructure layer implements. It depends only on `relaybot-types` --
//! never on `relaybot-infra` or any HTTP crate.

pub mod chat;
pub mod llm;
