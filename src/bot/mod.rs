//! Telegram front end: routing, conversation state and delivery

/// Routing of incoming text and the command set
pub mod dispatcher;
/// Conversation handlers
pub mod handlers;
/// Long-message splitting and best-effort delivery
pub mod messaging;
/// Telegram implementation of the transport
pub mod resilient;
/// User state and dialogue management
pub mod state;
/// Platform transport abstraction
pub mod transport;
/// Texts and keyboards
pub mod views;

pub use handlers::{handle_text, BotContext, IncomingText};
pub use resilient::TelegramTransport;
