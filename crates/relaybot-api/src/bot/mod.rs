//! Telegram front-end: command parsing and the long-polling runner.

pub mod commands;
pub mod telegram;
