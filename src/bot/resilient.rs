//! Resilient Telegram transport with automatic retry for API operations.
//!
//! [`TelegramTransport`] implements [`ChatTransport`] over a teloxide [`Bot`].
//! Every delivery goes through [`crate::utils::retry_telegram_operation`], so a
//! transient failure gets a couple more attempts before the caller sees an error.
//! The keep-alive ping is deliberately a single call.

use super::transport::{ChatActionKind, ChatTransport, ReplyKeyboard};
use super::views::keyboard_markup;
use crate::utils::retry_telegram_operation;
use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, InputFile};
use tracing::debug;

/// [`ChatTransport`] backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot instance
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

const fn chat_action(action: ChatActionKind) -> ChatAction {
    match action {
        ChatActionKind::Typing => ChatAction::Typing,
        ChatActionKind::UploadPhoto => ChatAction::UploadPhoto,
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<ReplyKeyboard>,
    ) -> Result<()> {
        retry_telegram_operation(|| async {
            let mut req = self.bot.send_message(ChatId(chat_id), text.to_string());
            if let Some(kb) = keyboard {
                req = req.reply_markup(keyboard_markup(kb));
            }
            req.await
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
        })
        .await
    }

    async fn send_chat_action(&self, chat_id: i64, action: ChatActionKind) -> Result<()> {
        retry_telegram_operation(|| async {
            self.bot
                .send_chat_action(ChatId(chat_id), chat_action(action))
                .await
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Telegram chat action error: {e}"))
        })
        .await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image: &[u8],
        caption: &str,
        keyboard: Option<ReplyKeyboard>,
    ) -> Result<()> {
        debug!(chat_id, bytes = image.len(), "Sending photo");
        retry_telegram_operation(|| async {
            let mut req = self
                .bot
                .send_photo(ChatId(chat_id), InputFile::memory(image.to_vec()))
                .caption(caption.to_string());
            if let Some(kb) = keyboard {
                req = req.reply_markup(keyboard_markup(kb));
            }
            req.await
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Telegram photo error: {e}"))
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.bot
            .get_me()
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram getMe error: {e}"))
    }
}
