//! Common messaging utilities for the Telegram bot.
//!
//! Sends never fail the caller: once the transport's own retries are spent the
//! error is logged and dropped.

use super::transport::{ChatActionKind, ChatTransport, ReplyKeyboard};
use crate::config::MAX_MESSAGE_LENGTH;
use crate::utils;
use tracing::warn;

/// Send one message, logging delivery failures.
///
/// Returns `true` if the message was delivered.
pub async fn send_best_effort(
    transport: &dyn ChatTransport,
    chat_id: i64,
    text: &str,
    keyboard: Option<ReplyKeyboard>,
) -> bool {
    match transport.send_text(chat_id, text, keyboard).await {
        Ok(()) => true,
        Err(e) => {
            warn!(chat_id, error = %e, "Failed to deliver message");
            false
        }
    }
}

/// Show a chat action, ignoring failures.
pub async fn show_action(transport: &dyn ChatTransport, chat_id: i64, action: ChatActionKind) {
    if let Err(e) = transport.send_chat_action(chat_id, action).await {
        warn!(chat_id, ?action, error = %e, "Failed to send chat action");
    }
}

/// Sends a long message by splitting it into multiple parts.
///
/// Parts are at most [`MAX_MESSAGE_LENGTH`] characters and are sent in order as
/// independent messages. Only the first carries the main keyboard. A failed part
/// does not stop the remaining ones.
///
/// # Examples
///
/// ```ignore
/// use relay_chat_bot::bot::messaging::send_long_message;
///
/// // Will automatically split if text exceeds 4096 characters
/// send_long_message(transport.as_ref(), chat_id, &very_long_response).await;
/// ```
pub async fn send_long_message(transport: &dyn ChatTransport, chat_id: i64, text: &str) {
    let parts = utils::split_message(text, MAX_MESSAGE_LENGTH);

    for (index, part) in parts.iter().enumerate() {
        let keyboard = (index == 0).then_some(ReplyKeyboard::Main);
        send_best_effort(transport, chat_id, part, keyboard).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::transport::MockChatTransport;
    use mockall::Sequence;

    #[tokio::test]
    async fn test_long_message_parts_in_order() {
        let text = format!("{}{}{}", "a".repeat(4096), "b".repeat(4096), "c".repeat(808));
        let mut transport = MockChatTransport::new();
        let mut seq = Sequence::new();

        for (ch, len, keyboard) in [
            ('a', 4096, Some(ReplyKeyboard::Main)),
            ('b', 4096, None),
            ('c', 808, None),
        ] {
            transport
                .expect_send_text()
                .withf(move |chat_id, text, kb| {
                    *chat_id == 5
                        && text.chars().count() == len
                        && text.chars().all(|c| c == ch)
                        && *kb == keyboard
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _| Ok(()));
        }

        send_long_message(&transport, 5, &text).await;
    }

    #[tokio::test]
    async fn test_failed_part_does_not_stop_the_rest() {
        let mut transport = MockChatTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send_text()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(anyhow::anyhow!("network down")));
        transport
            .expect_send_text()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        send_long_message(&transport, 1, &"x".repeat(5000)).await;
    }

    #[tokio::test]
    async fn test_best_effort_reports_failure() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_text()
            .withf(|chat_id, text, _| *chat_id == 3 && text == "hi")
            .returning(|_, _, _| Err(anyhow::anyhow!("blocked")));

        assert!(!send_best_effort(&transport, 3, "hi", None).await);
    }
}
