//! Chat and image-generation UI components
//!
//! Contains button labels, keyboards, and the Russian user-facing texts.

use crate::bot::transport::ReplyKeyboard;
use crate::llm::UpstreamError;
use crate::retry::RetryError;
use crate::utils::truncate_str;
use teloxide::types::{KeyboardButton, KeyboardMarkup};

// ─────────────────────────────────────────────────────────────────────────────
// Button labels
// ─────────────────────────────────────────────────────────────────────────────

/// Main menu button that starts an image request
pub const BUTTON_GENERATE_IMAGE: &str = "🖼 Сгенерировать изображение";
/// Main menu button that shows the help text
pub const BUTTON_HELP: &str = "❓ Помощь";
/// Cancel button shown while waiting for an image prompt
pub const BUTTON_CANCEL: &str = "Отмена";

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for chat UI view rendering
///
/// Provides all text messages for the chat and image flows.
pub trait ChatView {
    /// Greeting sent on `/start`
    fn greeting() -> &'static str;

    /// Command overview sent on `/help`
    fn help() -> &'static str;

    /// Request for an image description
    fn ask_image_prompt() -> &'static str;

    /// Confirmation that the image request was cancelled
    fn action_cancelled() -> &'static str;

    /// Chat message over the input cap
    fn message_too_long(max_chars: usize) -> String;

    /// Image prompt over the input cap
    fn prompt_too_long(max_chars: usize) -> String;

    /// Notice sent before the prompt is translated
    fn translating() -> &'static str;

    /// Notice sent while image generation backs off after a rate limit
    fn rate_limited(retry_in_secs: u64) -> String;

    /// Fallback when a generated photo could not be delivered
    fn photo_delivery_failed() -> &'static str;

    /// Fallback when the completion came back empty
    fn empty_response() -> &'static str;

    /// User message for a failed chat completion
    fn chat_failure(error: &RetryError<UpstreamError>) -> String;

    /// User message for a failed image generation
    fn image_failure(error: &RetryError<UpstreamError>) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default Russian-language implementation of `ChatView`
pub struct DefaultChatView;

const CHAT_ERROR_PREFIX: &str = "Извините, произошла ошибка при обработке вашего запроса.";
const IMAGE_ERROR_PREFIX: &str = "Извините, произошла ошибка при генерации изображения.";
const AUTH_PROBLEM: &str = " Проблема с аутентификацией API.";

impl ChatView for DefaultChatView {
    fn greeting() -> &'static str {
        "Привет! Я бот, который использует API DeepInfra для генерации текстов и Stability AI для генерации изображений.\n\n\
         Используйте кнопки меню или следующие команды:\n\
         /help - Получить справку\n\
         /image - Сгенерировать изображение по текстовому описанию"
    }

    fn help() -> &'static str {
        "Доступные команды:\n\
         /start - Начать работу с ботом\n\
         /help - Показать эту справку\n\
         /image - Сгенерировать изображение по текстовому описанию\n\n\
         Вы также можете использовать кнопки меню для выбора действий.\n\
         Просто напишите сообщение, чтобы получить ответ от ИИ."
    }

    fn ask_image_prompt() -> &'static str {
        "Опишите изображение, которое хотите сгенерировать:"
    }

    fn action_cancelled() -> &'static str {
        "Действие отменено."
    }

    fn message_too_long(max_chars: usize) -> String {
        format!("Извините, ваше сообщение слишком длинное. Максимальная длина: {max_chars} символов.")
    }

    fn prompt_too_long(max_chars: usize) -> String {
        format!("Извините, ваш запрос слишком длинный. Максимальная длина: {max_chars} символов.")
    }

    fn translating() -> &'static str {
        "Перевожу ваш запрос на английский для лучшей генерации изображения..."
    }

    fn rate_limited(retry_in_secs: u64) -> String {
        format!("Превышен лимит запросов к API. Повторная попытка через {retry_in_secs} сек...")
    }

    fn photo_delivery_failed() -> &'static str {
        "Произошла ошибка при отправке изображения. Попробуйте позже."
    }

    fn empty_response() -> &'static str {
        "Получен пустой ответ. Попробуйте переформулировать запрос."
    }

    fn chat_failure(error: &RetryError<UpstreamError>) -> String {
        match error {
            RetryError::Exhausted { .. } => {
                "К сожалению, не удалось получить ответ после нескольких попыток. Пожалуйста, попробуйте позже."
                    .to_string()
            }
            RetryError::Aborted(UpstreamError::ClientError { status: 401, .. }) => {
                format!("{CHAT_ERROR_PREFIX}{AUTH_PROBLEM}")
            }
            RetryError::Aborted(UpstreamError::ClientError { .. }) => CHAT_ERROR_PREFIX.to_string(),
            RetryError::Aborted(UpstreamError::Configuration(_)) => {
                "Извините, ключ API для генерации текста не настроен.".to_string()
            }
            RetryError::Aborted(_) => {
                "Произошла неожиданная ошибка при обработке вашего запроса. Попробуйте позже."
                    .to_string()
            }
        }
    }

    fn image_failure(error: &RetryError<UpstreamError>) -> String {
        match error {
            RetryError::Exhausted { .. } => {
                "К сожалению, не удалось сгенерировать изображение после нескольких попыток. Пожалуйста, попробуйте позже."
                    .to_string()
            }
            RetryError::Aborted(UpstreamError::Configuration(_)) => {
                "Извините, ключ API для генерации изображений не настроен.".to_string()
            }
            RetryError::Aborted(UpstreamError::ClientError { status: 400, .. }) => format!(
                "{IMAGE_ERROR_PREFIX} Некорректный запрос. Возможно, в запросе есть запрещенный контент."
            ),
            RetryError::Aborted(UpstreamError::ClientError { status: 401, .. }) => {
                format!("{IMAGE_ERROR_PREFIX}{AUTH_PROBLEM}")
            }
            RetryError::Aborted(UpstreamError::ClientError { .. }) => IMAGE_ERROR_PREFIX.to_string(),
            RetryError::Aborted(_) => {
                "Произошла неожиданная ошибка при генерации изображения. Попробуйте позже."
                    .to_string()
            }
        }
    }
}

/// Caption for a generated photo, cut to Telegram's caption limit
///
/// # Examples
///
/// ```
/// use relay_chat_bot::bot::views::photo_caption;
///
/// let caption = photo_caption("кот", "cat", 1024);
/// assert!(caption.contains("🇷🇺 кот"));
/// assert!(caption.contains("🇬🇧 cat"));
/// ```
#[must_use]
pub fn photo_caption(prompt: &str, english_prompt: &str, max_chars: usize) -> String {
    let caption = format!(
        "Сгенерированное изображение по запросу:\n\n🇷🇺 {prompt}\n\n🇬🇧 {english_prompt}"
    );
    truncate_str(caption, max_chars)
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

/// Get the main menu keyboard
///
/// # Examples
///
/// ```
/// use relay_chat_bot::bot::views::get_main_keyboard;
/// let keyboard = get_main_keyboard();
/// assert_eq!(keyboard.keyboard.len(), 2);
/// ```
#[must_use]
pub fn get_main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BUTTON_GENERATE_IMAGE)],
        vec![KeyboardButton::new(BUTTON_HELP)],
    ])
    .resize_keyboard()
}

/// Get the one-time cancel keyboard
#[must_use]
pub fn get_cancel_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BUTTON_CANCEL)]])
        .resize_keyboard()
        .one_time_keyboard()
}

/// Build the markup for a transport-level keyboard choice
#[must_use]
pub fn keyboard_markup(keyboard: ReplyKeyboard) -> KeyboardMarkup {
    match keyboard {
        ReplyKeyboard::Main => get_main_keyboard(),
        ReplyKeyboard::Cancel => get_cancel_keyboard(),
    }
}
