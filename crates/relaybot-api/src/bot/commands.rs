//! Slash command parsing for Telegram chats.
//!
//! Commands are normalized before matching: lowercased, first whitespace
//! token only, and any `@botname` suffix removed (Telegram appends it in
//! group chats, e.g. `/clear@math_bot`).

/// Commands understood by the Telegram front-end.
#[derive(Debug, PartialEq, Eq)]
pub enum BotCommand {
    /// Show the welcome and help text.
    Start,
    /// Clear this chat's history.
    Reset,
    /// Check that the inference backend is reachable.
    Test,
    /// A command addressed to a different bot in the same group.
    OtherBot,
    /// Anything else starting with `/`.
    Unknown(String),
}

/// Parse `text` as a command for the bot named `bot_username`.
///
/// Returns `None` when the text is not a command at all.
pub fn parse(text: &str, bot_username: &str) -> Option<BotCommand> {
    let first = text.trim().split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }

    let lowered = first.to_lowercase();
    let (command, target) = match lowered.split_once('@') {
        Some((command, target)) => (command, Some(target)),
        None => (lowered.as_str(), None),
    };

    if let Some(target) = target {
        let ours = bot_username.trim_start_matches('@');
        if !ours.is_empty() && !target.eq_ignore_ascii_case(ours) {
            return Some(BotCommand::OtherBot);
        }
    }

    Some(match command {
        "/start" | "/help" => BotCommand::Start,
        "/clear" | "/reset" => BotCommand::Reset,
        "/test" => BotCommand::Test,
        other => BotCommand::Unknown(other.to_string()),
    })
}

/// Welcome text for `/start`, in Telegram Markdown.
pub const HELP_TEXT: &str = "*Hi! I'm MathBot*\n\n\
Send me your math question!\n\n\
*Commands:*\n\
/start - Show this message\n\
/clear - Clear the conversation history\n\
/test - Check the model connection";

/// Reply for unrecognized commands.
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Use /start to see what I can do.";

/// Reply when a chat has too many messages waiting.
pub const BUSY_TEXT: &str = "I'm still working on your earlier messages. Please wait a moment.";
