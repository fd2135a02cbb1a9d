//! UI views: texts and keyboards shown to the user

mod chat;

pub use chat::{
    get_cancel_keyboard, get_main_keyboard, keyboard_markup, photo_caption, ChatView,
    DefaultChatView, BUTTON_CANCEL, BUTTON_GENERATE_IMAGE, BUTTON_HELP,
};
