//! Platform transport abstraction
//!
//! Handlers talk to the messaging platform only through [`ChatTransport`], so the
//! conversation logic can be exercised without a live bot token.

use anyhow::Result;
use async_trait::async_trait;

/// Reply keyboards the bot can attach to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKeyboard {
    /// Persistent menu with the image and help buttons
    Main,
    /// One-time keyboard with a single cancel button
    Cancel,
}

/// Chat actions shown while the bot is working
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatActionKind {
    /// "typing..."
    Typing,
    /// "sending photo..."
    UploadPhoto,
}

/// Outbound operations of the messaging platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a text message, optionally with a reply keyboard.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<ReplyKeyboard>,
    ) -> Result<()>;

    /// Shows a transient chat action.
    async fn send_chat_action(&self, chat_id: i64, action: ChatActionKind) -> Result<()>;

    /// Sends an encoded image with a caption.
    async fn send_photo(
        &self,
        chat_id: i64,
        image: &[u8],
        caption: &str,
        keyboard: Option<ReplyKeyboard>,
    ) -> Result<()>;

    /// Lightweight identity call used to keep the connection alive.
    async fn ping(&self) -> Result<()>;
}
