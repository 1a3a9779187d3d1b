//! Slash command parsing for the local chat loop.
//!
//! Mirrors the Telegram command set and adds terminal-only controls.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the conversation history.
    Reset,
    /// Check that the inference backend is reachable.
    Test,
    /// Show the stored history for this session.
    History,
    /// Exit the chat loop.
    Exit,
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let first = trimmed.split_whitespace().next().unwrap_or(trimmed);
    let cmd = first.to_lowercase();
    let cmd = cmd.split('@').next().unwrap_or_default();

    match cmd {
        "/help" | "/start" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/reset" => Some(ChatCommand::Reset),
        "/test" => Some(ChatCommand::Test),
        "/history" => Some(ChatCommand::History),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     {}", style("/help").cyan(), "Show this help message");
    println!("  {}    {}", style("/clear").cyan(), "Clear the conversation history");
    println!("  {}     {}", style("/test").cyan(), "Check the model connection");
    println!("  {}  {}", style("/history").cyan(), "Show the stored history");
    println!("  {}     {}", style("/exit").cyan(), "End the chat session");
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}
