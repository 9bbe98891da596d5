use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::{info, warn};

use crate::notifier::PhotoSource;

const WELCOME_TEXT: &str = "Hello! I'm the crypto news watcher.\n\n\
     I follow a list of X accounts and forward keyword matches here.\n\
     Send /start any time to see this message again.";

pub struct ResponderState {
    pub welcome_photo: Option<PhotoSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
}

/// Substring command matching: "/start" anywhere in the message counts,
/// so "please /start now" triggers the welcome just like a bare "/start".
pub fn matched_command(text: &str) -> Option<Command> {
    let normalized = text.to_lowercase();
    if normalized.contains("/start") {
        Some(Command::Start)
    } else {
        None
    }
}

/// Long-poll loop over inbound messages. Offset bookkeeping, the bounded
/// getUpdates timeout, and backoff after transport failures all live in
/// teloxide's polling listener; each update reaches the handler at most
/// once. Runs until the process is killed.
pub async fn run(bot: Bot, state: Arc<ResponderState>) -> Result<()> {
    info!("Starting command responder...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            warn!("Ignoring unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("responder"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<ResponderState>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    match matched_command(text) {
        Some(Command::Start) => {
            info!("Start command in chat {}", msg.chat.id);
            send_welcome(&bot, msg.chat.id, &state).await;
        }
        // Anything unrecognized is silently ignored; no error reply.
        None => {}
    }

    Ok(())
}

async fn send_welcome(bot: &Bot, chat: ChatId, state: &ResponderState) {
    if let Err(e) = bot.send_message(chat, WELCOME_TEXT).await {
        warn!("Failed to send welcome message: {}", e);
    }
    if let Some(photo) = &state.welcome_photo {
        if let Err(e) = bot.send_photo(chat, photo.input_file()).await {
            warn!("Failed to send welcome photo: {}", e);
        }
    }
}
