//! Session key and history trimming types for relaybot.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Opaque identifier scoping one conversation history.
///
/// Telegram chat ids are integers; the local REPL uses a fixed name.
/// Both are normalized to their string form so they share one keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for SessionKey {
    fn from(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Eviction rule applied when a history grows past its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimPolicy {
    /// Keep a leading `system` message and the most recent `max - 1` others.
    #[default]
    Pinned,
    /// Keep the most recent `max` messages, whatever their role.
    Fifo,
}

impl fmt::Display for TrimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimPolicy::Pinned => write!(f, "pinned"),
            TrimPolicy::Fifo => write!(f, "fifo"),
        }
    }
}

impl FromStr for TrimPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinned" => Ok(TrimPolicy::Pinned),
            "fifo" => Ok(TrimPolicy::Fifo),
            other => Err(format!("invalid trim policy: '{other}'")),
        }
    }
}
