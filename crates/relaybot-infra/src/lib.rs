//! Infrastructure layer for relaybot.
//!
//! Contains the outward-facing adapters behind the traits defined in
//! `relaybot-core`: the Ollama inference client, the Telegram Bot API
//! client, and the TOML config loader.

pub mod config;
pub mod llm;
pub mod telegram;
