//! Per-session conversation state and the turn pipeline built on it.
//!
//! - `history`: one bounded message sequence and its trim rule
//! - `store`: keyed, thread-safe storage of histories
//! - `orchestrator`: user message -> model round-trip -> history update
//! - `dispatcher`: per-session mailboxes preserving arrival order

pub mod dispatcher;
pub mod history;
pub mod orchestrator;
pub mod store;
