//! Shared domain types for relaybot.
//!
//! This crate contains the domain types used across the relay bot:
//! session keys, chat messages, trim policies, bot configuration, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, thiserror, secrecy.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
