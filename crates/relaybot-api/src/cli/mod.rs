//! CLI command definitions for the `relaybot` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod check;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Relay chat messages to a local language model.
#[derive(Parser)]
#[command(name = "relaybot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (default: ./relaybot.toml, then the user config dir).
    #[arg(long, global = true, env = "RELAYBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export trace spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot (long polling).
    Telegram,

    /// Chat with the model in the terminal.
    Chat,

    /// Check that the inference backend is reachable and answering.
    Check,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
