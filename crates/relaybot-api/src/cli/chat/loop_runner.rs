//! The local chat loop.
//!
//! Reads lines from the terminal and drives the shared orchestrator with a
//! fixed session key, so the REPL behaves exactly like one Telegram chat.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use relaybot_types::chat::SessionKey;
use relaybot_types::llm::MessageRole;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use crate::state::AppState;

/// Session key used by the terminal front-end.
pub const LOCAL_SESSION: &str = "local";

/// Longest message preview shown by `/history`, in characters.
const PREVIEW_CHARS: usize = 100;

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

fn preview(content: &str) -> String {
    let single_line = content.replace('\n', " ");
    if single_line.chars().count() > PREVIEW_CHARS {
        let cut: String = single_line.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        single_line
    }
}

/// Run the interactive chat loop until `/exit` or Ctrl+D.
pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let orchestrator = &state.orchestrator;
    let store = orchestrator.store();
    let key = SessionKey::from(LOCAL_SESSION);

    print_welcome_banner(
        orchestrator.client().name(),
        orchestrator.client().model(),
        store.max_messages(),
        &store.policy().to_string(),
    );

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match cmd {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::Reset => {
                            let reply = orchestrator.reset(&key).await;
                            println!("\n  {} {}\n", style("*").cyan().bold(), reply);
                        }
                        ChatCommand::Test => {
                            let spinner = thinking_spinner();
                            let reply = orchestrator.check_inference().await;
                            spinner.finish_and_clear();
                            println!("\n  {}\n", reply.replace('\n', "\n  "));
                        }
                        ChatCommand::History => {
                            let messages = store.get_history(&key);
                            println!();
                            if messages.is_empty() {
                                println!("  {}", style("(no history)").dim());
                            }
                            for msg in &messages {
                                let label = match msg.role {
                                    MessageRole::User => style("You").green(),
                                    MessageRole::Assistant => style("Bot").cyan(),
                                    MessageRole::System => style("System").dim(),
                                };
                                println!("  {} {}", label.bold(), preview(&msg.content));
                            }
                            println!();
                        }
                        ChatCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            break;
                        }
                        ChatCommand::Unknown(name) => {
                            println!(
                                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                style("?").yellow().bold(),
                                style(name).dim()
                            );
                        }
                    }
                    continue;
                }

                let spinner = thinking_spinner();
                let reply = orchestrator.handle_user_turn(&key, &text).await;
                spinner.finish_and_clear();

                println!("\n  {} {}\n", style("Bot >").cyan().bold(), reply.trim());
            }
        }
    }

    chat_input.flush();
    Ok(())
}
