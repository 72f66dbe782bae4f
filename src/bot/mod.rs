//! Bot module for handling Telegram interactions
//!
//! - `message_handler`: turns incoming messages into conversation events and sends the replies
//! - `telegram`: Telegram-backed image fetching and archive forwarding

pub mod message_handler;
pub mod telegram;

// Re-export main handler functions for use in main.rs
pub use message_handler::{message_handler, BotDialogue};
pub use telegram::TelegramArchive;
