//! Routing of incoming text
//!
//! Priority: exact commands, then the main-menu buttons, then the user's
//! conversation state. The cancel button is only meaningful while an image
//! prompt is awaited; otherwise it is ordinary chat text.

use super::state::State;
use super::views::{BUTTON_CANCEL, BUTTON_GENERATE_IMAGE, BUTTON_HELP};
use teloxide::utils::command::BotCommands;

/// Supported bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    /// Начать работу с ботом
    #[command(description = "Начать работу с ботом")]
    Start,
    /// Показать справку
    #[command(description = "Показать справку")]
    Help,
    /// Сгенерировать изображение по текстовому описанию
    #[command(description = "Сгенерировать изображение по текстовому описанию")]
    Image,
}

/// What the bot should do with one incoming text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Send the greeting
    Start,
    /// Send the help text
    Help,
    /// Ask for an image prompt and wait for it
    RequestImage,
    /// Leave the image flow
    Cancel,
    /// Treat the text as an image prompt
    ImagePrompt,
    /// Forward the text to the completion API
    Chat,
}

/// Decide how to handle `text` given the sender's current `state`.
///
/// `bot_username` lets `/command@botname` forms match too.
///
/// # Examples
///
/// ```
/// use relay_chat_bot::bot::dispatcher::{route, Route};
/// use relay_chat_bot::bot::state::State;
///
/// assert_eq!(route("/image", State::Idle, "bot"), Route::RequestImage);
/// assert_eq!(route("Отмена", State::Idle, "bot"), Route::Chat);
/// assert_eq!(route("Отмена", State::AwaitingImagePrompt, "bot"), Route::Cancel);
/// ```
#[must_use]
pub fn route(text: &str, state: State, bot_username: &str) -> Route {
    if let Ok(command) = Command::parse(text, bot_username) {
        return match command {
            Command::Start => Route::Start,
            Command::Help => Route::Help,
            Command::Image => Route::RequestImage,
        };
    }

    match text {
        BUTTON_GENERATE_IMAGE => return Route::RequestImage,
        BUTTON_HELP => return Route::Help,
        _ => {}
    }

    match state {
        State::AwaitingImagePrompt if text == BUTTON_CANCEL => Route::Cancel,
        State::AwaitingImagePrompt => Route::ImagePrompt,
        State::Idle => Route::Chat,
    }
}
