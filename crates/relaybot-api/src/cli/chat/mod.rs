//! Interactive terminal chat for relaybot.
//!
//! Runs the same conversation core as the Telegram front-end under one fixed
//! session key, with a thinking spinner and slash commands. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
