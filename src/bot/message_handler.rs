//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::prelude::*;
use teloxide::types::Me;
use tracing::{debug, error};

use crate::dialogue::{Conversation, ConversationState, Event, PhotoVariant};

/// Telegram's hard limit on the length of one text message
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Type alias for the conversation dialogue
pub type BotDialogue = Dialogue<ConversationState, InMemStorage<ConversationState>>;

/// Map an incoming message to a conversation event
///
/// `bot_name` is the bot's username, used to ignore commands addressed to other bots.
pub fn event_from_message(msg: &Message, bot_name: &str) -> Event {
    let first_name = msg
        .from
        .as_ref()
        .map(|user| user.first_name.as_str())
        .unwrap_or_default();

    if let Some(text) = msg.text() {
        return Event::from_text(text, first_name, bot_name);
    }

    if let Some(photos) = msg.photo() {
        let variants = photos
            .iter()
            .map(|photo| PhotoVariant {
                file_id: photo.file.id.0.clone(),
                width: photo.width,
                height: photo.height,
                file_size: photo.file.size,
            })
            .collect();
        return Event::Image(variants);
    }

    if let Some(doc) = msg.document() {
        let is_image = doc
            .mime_type
            .as_ref()
            .is_some_and(|mime_type| mime_type.to_string().starts_with("image/"));
        if is_image {
            return Event::Image(vec![PhotoVariant {
                file_id: doc.file.id.0.clone(),
                width: 0,
                height: 0,
                file_size: doc.file.size,
            }]);
        }
    }

    Event::Other
}

/// Split a reply into chunks Telegram will accept, on character boundaries
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    me: Me,
    dialogue: BotDialogue,
    conversation: Arc<Conversation>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    let event = event_from_message(&msg, me.username());
    let state = dialogue.get().await?.unwrap_or_default();
    let transition = conversation.handle(user.id, &state, event).await;

    if transition.next == ConversationState::Idle {
        dialogue.exit().await?;
    } else {
        dialogue.update(transition.next).await?;
    }

    for reply in &transition.replies {
        for chunk in split_message(reply, TELEGRAM_MESSAGE_LIMIT) {
            if let Err(e) = bot.send_message(msg.chat.id, chunk).await {
                error!(chat_id = %msg.chat.id, error = %e, "Failed to send reply");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_message_short_text() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
        assert!(split_message("", 10).is_empty());
    }

    #[test]
    fn test_split_message_respects_char_boundaries() {
        let text = "ж".repeat(9);
        let chunks = split_message(&text, 4);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 4);
        assert_eq!(chunks[2].chars().count(), 1);
        assert_eq!(chunks.concat(), text);
    }
}
