//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tracing::warn;

use crate::journal::gateway::{Messenger, TransportError};

/// Telegram caps a message at 4096 UTF-16 units; stay under it in chars.
const MAX_MESSAGE_CHARS: usize = 4000;

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send plain text, split into several messages if it is too long.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        for chunk in split_message(text) {
            self.bot.send_message(ChatId(chat_id), chunk).await.map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                TransportError(msg)
            })?;
        }
        Ok(())
    }

    /// Show the "typing..." indicator. Failures are ignored.
    pub async fn send_typing(&self, chat_id: i64) {
        if let Err(e) = self.bot.send_chat_action(ChatId(chat_id), ChatAction::Typing).await {
            warn!("Failed to send typing action: {e}");
        }
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, recipient: i64, text: &str) -> Result<(), TransportError> {
        self.send_message(recipient, text).await
    }
}

/// Split on line boundaries where possible, hard-splitting lines that are too long.
fn split_message(text: &str) -> Vec<String> {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > MAX_MESSAGE_CHARS && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > MAX_MESSAGE_CHARS {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(MAX_MESSAGE_CHARS) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
