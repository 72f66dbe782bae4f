//! # Handwriting Dataset Bot
//!
//! A Telegram bot that hands out random texts from a Google Drive folder and
//! collects photos of their handwritten transcriptions into an archive chat.

pub mod archive;
pub mod bot;
pub mod config;
pub mod dialogue;
pub mod drive;
pub mod errors;
pub mod file_picker;
pub mod messages;
pub mod session;
