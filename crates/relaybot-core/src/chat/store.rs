//! Conversation store: thread-safe keyed storage of bounded histories.
//!
//! Histories live in a `DashMap`, so operations on different session keys
//! only contend when they hash to the same shard, and operations on one key
//! are serialized by that shard's lock. Every method is synchronous and
//! releases its guard before returning -- never hold a `DashMap` guard
//! across an await.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use relaybot_types::chat::{SessionKey, TrimPolicy};
use relaybot_types::config::HistoryConfig;
use relaybot_types::error::ConfigError;
use relaybot_types::llm::Message;

use super::history::History;

/// Smallest usable bound: room for one user/assistant pair.
pub const MIN_HISTORY_MESSAGES: usize = 2;

/// Owns every session's [`History`].
///
/// Reads return owned snapshots; no caller ever holds a reference into
/// stored state.
#[derive(Debug)]
pub struct ConversationStore {
    histories: DashMap<SessionKey, History>,
    max_messages: usize,
    policy: TrimPolicy,
    evicted_total: AtomicU64,
}

impl ConversationStore {
    /// Create a store bounding each history to `max_messages`.
    ///
    /// Fails if `max_messages` is below [`MIN_HISTORY_MESSAGES`].
    pub fn new(max_messages: usize, policy: TrimPolicy) -> Result<Self, ConfigError> {
        if max_messages < MIN_HISTORY_MESSAGES {
            return Err(ConfigError::HistoryBoundTooSmall(max_messages));
        }
        Ok(Self {
            histories: DashMap::new(),
            max_messages,
            policy,
            evicted_total: AtomicU64::new(0),
        })
    }

    pub fn from_config(config: &HistoryConfig) -> Result<Self, ConfigError> {
        Self::new(config.max_messages, config.trim_policy)
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn policy(&self) -> TrimPolicy {
        self.policy
    }

    /// Snapshot of the session's history; empty for unknown keys.
    pub fn get_history(&self, key: &SessionKey) -> Vec<Message> {
        self.histories
            .get(key)
            .map(|history| history.messages().to_vec())
            .unwrap_or_default()
    }

    /// Pin `text` as the session's system directive unless one exists.
    ///
    /// A full history makes room by evicting its oldest turn, whatever the
    /// policy, so the new directive itself always survives the pin.
    pub fn ensure_system_prompt(&self, key: &SessionKey, text: &str) {
        let mut history = self.histories.entry(key.clone()).or_default();
        if history.ensure_system(text) {
            let evicted = history.trim(self.max_messages, TrimPolicy::Pinned);
            self.record_eviction(key, evicted, history.len());
            debug!(session = %key, "pinned system directive");
        }
    }

    pub fn append_user(&self, key: &SessionKey, text: &str) {
        self.append(key, Message::user(text));
    }

    pub fn append_assistant(&self, key: &SessionKey, text: &str) {
        self.append(key, Message::assistant(text));
    }

    /// Drop the whole history for `key`, pinned directive included.
    pub fn reset(&self, key: &SessionKey) {
        if self.histories.remove(key).is_some() {
            debug!(session = %key, "history reset");
        }
    }

    /// Number of messages currently stored for `key`.
    pub fn len(&self, key: &SessionKey) -> usize {
        self.histories.get(key).map(|h| h.len()).unwrap_or(0)
    }

    /// Number of sessions with a live history.
    pub fn session_count(&self) -> usize {
        self.histories.len()
    }

    /// Messages evicted by trimming since the store was created.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total.load(Ordering::Relaxed)
    }

    fn append(&self, key: &SessionKey, message: Message) {
        let mut history = self.histories.entry(key.clone()).or_default();
        history.push(message);
        let evicted = history.trim(self.max_messages, self.policy);
        self.record_eviction(key, evicted, history.len());
    }

    fn record_eviction(&self, key: &SessionKey, evicted: usize, len: usize) {
        if evicted > 0 {
            self.evicted_total
                .fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(session = %key, evicted, len, "history trimmed");
        }
    }
}
