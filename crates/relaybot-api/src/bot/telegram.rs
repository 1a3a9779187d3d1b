//! Telegram long-polling runner.
//!
//! Polls `getUpdates`, turns each text message into a [`SessionRequest`],
//! and hands it to the [`SessionDispatcher`]. Replies come back through
//! [`TelegramSink`]. Non-text updates are skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relaybot_core::chat::dispatcher::{DispatchError, ReplySink, SessionDispatcher, SessionRequest};
use relaybot_infra::telegram::TelegramClient;
use relaybot_types::chat::SessionKey;

use super::commands::{self, BotCommand};
use crate::state::AppState;

/// First delay after a failed poll; doubles up to [`MAX_BACKOFF`].
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delivers replies to Telegram chats.
pub struct TelegramSink {
    client: Arc<TelegramClient>,
}

impl TelegramSink {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

fn chat_id(key: &SessionKey) -> Option<i64> {
    key.as_str().parse().ok()
}

impl ReplySink for TelegramSink {
    async fn deliver(&self, key: &SessionKey, text: String) {
        let Some(chat_id) = chat_id(key) else {
            warn!(session = %key, "session key is not a Telegram chat id");
            return;
        };
        match self.client.send_message(chat_id, &text).await {
            Ok(()) => debug!(chat_id, "reply sent"),
            Err(e) => warn!(chat_id, error = %e, "failed to send reply"),
        }
    }

    async fn turn_started(&self, key: &SessionKey) {
        if let Some(chat_id) = chat_id(key) {
            if let Err(e) = self.client.send_typing(chat_id).await {
                debug!(chat_id, error = %e, "typing indicator failed");
            }
        }
    }
}

/// What to do with one incoming text message.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    /// Queue behind the chat's pending work.
    Dispatch(SessionRequest),
    /// Drop silently.
    Ignore,
}

fn notice(text: &str) -> Route {
    Route::Dispatch(SessionRequest::Notice(text.to_string()))
}

/// Decide how to handle `text` for the bot named `bot_username`.
pub fn route(text: &str, bot_username: &str) -> Route {
    match commands::parse(text, bot_username) {
        None => Route::Dispatch(SessionRequest::UserTurn(text.to_string())),
        Some(BotCommand::Start) => notice(commands::HELP_TEXT),
        Some(BotCommand::Reset) => Route::Dispatch(SessionRequest::Reset),
        Some(BotCommand::Test) => Route::Dispatch(SessionRequest::CheckInference),
        Some(BotCommand::OtherBot) => Route::Ignore,
        Some(BotCommand::Unknown(command)) => {
            debug!(%command, "unknown command");
            notice(commands::UNKNOWN_COMMAND_TEXT)
        }
    }
}

/// Run the Telegram front-end until `cancel` fires.
pub async fn run_telegram(state: &AppState, cancel: CancellationToken) -> anyhow::Result<()> {
    let telegram = &state.config.telegram;
    telegram.validate().context("telegram front-end is not configured")?;

    let token = SecretString::from(telegram.token.expose_secret().to_string());
    let client = Arc::new(TelegramClient::new(token).context("failed to create Telegram client")?);

    let me = client.get_me().await.context("Telegram rejected the bot token")?;
    let username = me.username.unwrap_or_else(|| telegram.username.clone());
    if !telegram.username.trim_start_matches('@').eq_ignore_ascii_case(&username) {
        warn!(configured = %telegram.username, actual = %username, "configured username differs from getMe");
    }
    info!(bot = %username, "Telegram bot started (long polling)");

    let sink = Arc::new(TelegramSink::new(client.clone()));
    let dispatcher = SessionDispatcher::new(state.orchestrator.clone(), sink.clone());

    let mut offset: i64 = 0;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let updates = tokio::select! {
            _ = cancel.cancelled() => break,
            result = client.get_updates(offset, telegram.poll_timeout_secs) => result,
        };

        let updates = match updates {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                updates
            }
            Err(e) => {
                warn!(error = %e, retry_in = ?backoff, "Telegram polling error");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some((chat_id, text)) = update.text_message() else {
                debug!(update_id = update.update_id, "skipping non-text update");
                continue;
            };

            let key = SessionKey::from(chat_id);
            debug!(session = %key, "incoming message");
            match route(text, &username) {
                Route::Dispatch(request) => match dispatcher.dispatch(key, request) {
                    Ok(()) => {}
                    Err(DispatchError::MailboxFull(key)) => {
                        // The mailbox has no room, so this one notice skips the queue.
                        warn!(session = %key, "mailbox full, rejecting message");
                        spawn_busy_reply(&sink, key);
                    }
                    Err(e) => warn!(error = %e, "dispatch failed"),
                },
                Route::Ignore => {}
            }
        }
    }

    dispatcher.close();
    info!("Telegram bot stopped");
    Ok(())
}

fn spawn_busy_reply(sink: &Arc<TelegramSink>, key: SessionKey) {
    let sink = sink.clone();
    tokio::spawn(async move { sink.deliver(&key, commands::BUSY_TEXT.to_string()).await });
}
