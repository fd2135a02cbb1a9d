//! Conversation handlers
//!
//! [`handle_text`] is the single entry point for incoming text. It routes the
//! text, drives the per-user state machine and turns every upstream failure
//! into a user-facing message; nothing is propagated back to the dispatcher.

use super::dispatcher::{route, Route};
use super::messaging::{send_best_effort, send_long_message, show_action};
use super::state::{ConversationStore, State};
use super::transport::{ChatActionKind, ChatTransport, ReplyKeyboard};
use super::views::{photo_caption, ChatView, DefaultChatView};
use crate::config::{MAX_CAPTION_LENGTH, MAX_INPUT_LENGTH};
use crate::liveness::ActivityClock;
use crate::llm::{ImageProvider, TextProvider, UpstreamError};
use crate::retry::{RetryAttempt, RetryObserver};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::types::Message;
use tracing::{info, warn};

/// One text message, stripped of platform details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingText {
    /// Sender; keys the conversation state
    pub user_id: i64,
    /// Chat to answer in
    pub chat_id: i64,
    /// Message text
    pub text: String,
}

impl IncomingText {
    /// Extract the text part of a Telegram message.
    ///
    /// Returns `None` for non-text messages. When the sender is unknown the
    /// chat id stands in for the user id.
    #[must_use]
    pub fn from_message(msg: &Message) -> Option<Self> {
        let text = msg.text()?;
        let chat_id = msg.chat.id.0;
        let user_id = msg
            .from
            .as_ref()
            .map_or(chat_id, |u| u.id.0.cast_signed());

        Some(Self {
            user_id,
            chat_id,
            text: text.to_string(),
        })
    }
}

/// Shared dependencies of the handlers
#[derive(Clone)]
pub struct BotContext {
    /// Per-user conversation states
    pub conversations: ConversationStore,
    /// Last user interaction, read by the liveness monitor
    pub activity: Arc<ActivityClock>,
    /// Chat and translation upstream
    pub text: Arc<dyn TextProvider>,
    /// Image upstream
    pub image: Arc<dyn ImageProvider>,
    /// Bot username, for `/command@bot` forms
    pub bot_username: String,
}

/// Tells the user when image generation is backing off after a rate limit
struct RateLimitNotice<'a> {
    transport: &'a dyn ChatTransport,
    chat_id: i64,
}

#[async_trait]
impl RetryObserver<UpstreamError> for RateLimitNotice<'_> {
    async fn on_retry(&self, attempt: &RetryAttempt<'_, UpstreamError>) {
        if matches!(attempt.error, UpstreamError::RateLimited) {
            let notice = DefaultChatView::rate_limited(attempt.delay_before_next.as_secs());
            send_best_effort(self.transport, self.chat_id, &notice, None).await;
        }
    }
}

/// Handle one incoming text message.
pub async fn handle_text(ctx: &BotContext, transport: &dyn ChatTransport, incoming: IncomingText) {
    ctx.activity.touch();

    let IncomingText {
        user_id,
        chat_id,
        text,
    } = incoming;
    let state = ctx.conversations.get(user_id).await;

    match route(&text, state, &ctx.bot_username) {
        Route::Start => {
            info!(user_id, "User started the bot");
            send_best_effort(
                transport,
                chat_id,
                DefaultChatView::greeting(),
                Some(ReplyKeyboard::Main),
            )
            .await;
        }
        Route::Help => {
            info!(user_id, "User requested help");
            send_best_effort(
                transport,
                chat_id,
                DefaultChatView::help(),
                Some(ReplyKeyboard::Main),
            )
            .await;
        }
        Route::RequestImage => {
            info!(user_id, "User requested image generation");
            ctx.conversations
                .set(user_id, State::AwaitingImagePrompt)
                .await;
            send_best_effort(
                transport,
                chat_id,
                DefaultChatView::ask_image_prompt(),
                Some(ReplyKeyboard::Cancel),
            )
            .await;
        }
        Route::Cancel => {
            info!(user_id, "User cancelled image generation");
            ctx.conversations.reset(user_id).await;
            send_best_effort(
                transport,
                chat_id,
                DefaultChatView::action_cancelled(),
                Some(ReplyKeyboard::Main),
            )
            .await;
        }
        Route::ImagePrompt => {
            // The prompt is consumed whatever happens next
            ctx.conversations.reset(user_id).await;
            handle_image_prompt(ctx, transport, user_id, chat_id, &text).await;
        }
        Route::Chat => handle_chat(ctx, transport, user_id, chat_id, &text).await,
    }
}

async fn handle_image_prompt(
    ctx: &BotContext,
    transport: &dyn ChatTransport,
    user_id: i64,
    chat_id: i64,
    prompt: &str,
) {
    if prompt.chars().count() > MAX_INPUT_LENGTH {
        warn!(user_id, "Image prompt over input cap, rejected");
        send_best_effort(
            transport,
            chat_id,
            &DefaultChatView::prompt_too_long(MAX_INPUT_LENGTH),
            Some(ReplyKeyboard::Main),
        )
        .await;
        return;
    }

    show_action(transport, chat_id, ChatActionKind::Typing).await;
    send_best_effort(transport, chat_id, DefaultChatView::translating(), None).await;
    let english_prompt = ctx.text.translate(prompt).await;

    show_action(transport, chat_id, ChatActionKind::UploadPhoto).await;
    let notice = RateLimitNotice { transport, chat_id };

    match ctx.image.generate_image(&english_prompt, &notice).await {
        Ok(images) => {
            let caption = photo_caption(prompt, &english_prompt, MAX_CAPTION_LENGTH);
            for image in &images {
                if let Err(e) = transport
                    .send_photo(chat_id, image, &caption, Some(ReplyKeyboard::Main))
                    .await
                {
                    warn!(user_id, error = %e, "Failed to deliver generated image");
                    send_best_effort(
                        transport,
                        chat_id,
                        DefaultChatView::photo_delivery_failed(),
                        Some(ReplyKeyboard::Main),
                    )
                    .await;
                }
            }
            info!(user_id, count = images.len(), "Image request completed");
        }
        Err(e) => {
            warn!(
                user_id,
                status = ?e.last_error().status(),
                error = %e,
                "Image generation failed"
            );
            send_best_effort(
                transport,
                chat_id,
                &DefaultChatView::image_failure(&e),
                Some(ReplyKeyboard::Main),
            )
            .await;
        }
    }
}

async fn handle_chat(
    ctx: &BotContext,
    transport: &dyn ChatTransport,
    user_id: i64,
    chat_id: i64,
    text: &str,
) {
    if text.chars().count() > MAX_INPUT_LENGTH {
        warn!(user_id, "Message over input cap, rejected");
        send_best_effort(
            transport,
            chat_id,
            &DefaultChatView::message_too_long(MAX_INPUT_LENGTH),
            Some(ReplyKeyboard::Main),
        )
        .await;
        return;
    }

    show_action(transport, chat_id, ChatActionKind::Typing).await;

    match ctx.text.chat(text).await {
        Ok(answer) if answer.trim().is_empty() => {
            warn!(user_id, "Completion API returned an empty answer");
            send_best_effort(
                transport,
                chat_id,
                DefaultChatView::empty_response(),
                Some(ReplyKeyboard::Main),
            )
            .await;
        }
        Ok(answer) => {
            send_long_message(transport, chat_id, &answer).await;
            info!(user_id, chars = answer.chars().count(), "Answer delivered");
        }
        Err(e) => {
            warn!(
                user_id,
                status = ?e.last_error().status(),
                error = %e,
                "Chat completion failed"
            );
            send_best_effort(
                transport,
                chat_id,
                &DefaultChatView::chat_failure(&e),
                Some(ReplyKeyboard::Main),
            )
            .await;
        }
    }
}
