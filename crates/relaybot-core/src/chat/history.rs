//! Bounded per-session message history.
//!
//! A `History` is a plain ordered `Vec<Message>` plus the two operations that
//! give it shape: pinning a system directive at position 0 and trimming back
//! to a bound. Locking is the caller's job (see [`super::store`]).

use relaybot_types::chat::TrimPolicy;
use relaybot_types::llm::Message;

/// Ordered message sequence for one session.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The pinned directive, if the history starts with a `system` message.
    pub fn pinned(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.is_system())
    }

    /// Insert `text` as a `system` message at position 0 unless a `system`
    /// message is already present anywhere in the history.
    ///
    /// Returns `true` if a message was inserted.
    pub fn ensure_system(&mut self, text: &str) -> bool {
        if self.messages.iter().any(Message::is_system) {
            return false;
        }
        self.messages.insert(0, Message::system(text));
        true
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Trim the history down to `max` messages and return how many were
    /// evicted.
    ///
    /// Under [`TrimPolicy::Pinned`] a leading `system` message is never
    /// evicted and the most recent `max - 1` messages are kept after it.
    /// Under [`TrimPolicy::Fifo`] the most recent `max` messages are kept.
    pub fn trim(&mut self, max: usize, policy: TrimPolicy) -> usize {
        let len = self.messages.len();
        if len <= max {
            return 0;
        }

        // [pinned][evicted ...][max - 1 recent]
        let start = match policy {
            TrimPolicy::Pinned if self.pinned().is_some() => 1,
            _ => 0,
        };
        let evicted = len - max;
        self.messages.drain(start..start + evicted);
        evicted
    }
}
