use handwriting_bot::bot::message_handler::{event_from_message, split_message, TELEGRAM_MESSAGE_LIMIT};
use handwriting_bot::dialogue::{best_variant, Event};
use serde_json::json;
use teloxide::types::Message;

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_NAME: &str = "handwriting_bot";

    fn message(extra: serde_json::Value) -> Message {
        let mut value = json!({
            "message_id": 42,
            "date": 1_700_000_000,
            "chat": { "id": 555, "type": "private", "first_name": "Мария" },
            "from": { "id": 555, "is_bot": false, "first_name": "Мария" }
        });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(value).expect("valid Telegram message")
    }

    /// Test command messages become command events
    #[test]
    fn test_text_commands() {
        let start = event_from_message(&message(json!({ "text": "/start" })), BOT_NAME);
        assert_eq!(
            start,
            Event::Start {
                first_name: "Мария".to_string()
            }
        );

        let get_text = event_from_message(&message(json!({ "text": "/gettext" })), BOT_NAME);
        assert_eq!(get_text, Event::GetText);

        let chatter = event_from_message(&message(json!({ "text": "привет" })), BOT_NAME);
        assert_eq!(chatter, Event::Other);

        let addressed = event_from_message(
            &message(json!({ "text": "/gettext@handwriting_bot" })),
            BOT_NAME,
        );
        assert_eq!(addressed, Event::GetText);

        let other_bot =
            event_from_message(&message(json!({ "text": "/gettext@other_bot" })), BOT_NAME);
        assert_eq!(other_bot, Event::Other);
    }

    /// Test compressed photos carry every size variant
    #[test]
    fn test_photo_message_variants() {
        let msg = message(json!({
            "photo": [
                { "file_id": "small", "file_unique_id": "u1", "file_size": 1200, "width": 90, "height": 67 },
                { "file_id": "large", "file_unique_id": "u2", "file_size": 98000, "width": 1280, "height": 960 },
                { "file_id": "medium", "file_unique_id": "u3", "file_size": 15000, "width": 320, "height": 240 }
            ]
        }));

        let Event::Image(variants) = event_from_message(&msg, BOT_NAME) else {
            panic!("photo message should map to an image event");
        };
        assert_eq!(variants.len(), 3);
        assert_eq!(best_variant(&variants).unwrap().file_id, "large");
    }

    /// Test image documents are treated as photos
    #[test]
    fn test_image_document() {
        let msg = message(json!({
            "document": {
                "file_id": "scan", "file_unique_id": "u4", "file_name": "page.png",
                "mime_type": "image/png", "file_size": 400000
            }
        }));

        let Event::Image(variants) = event_from_message(&msg, BOT_NAME) else {
            panic!("image document should map to an image event");
        };
        assert_eq!(variants[0].file_id, "scan");
        assert_eq!(variants[0].file_size, 400000);
    }

    /// Test non-image documents are not photos
    #[test]
    fn test_non_image_document() {
        let msg = message(json!({
            "document": {
                "file_id": "notes", "file_unique_id": "u5", "file_name": "notes.pdf",
                "mime_type": "application/pdf", "file_size": 1000
            }
        }));

        assert_eq!(event_from_message(&msg, BOT_NAME), Event::Other);
    }

    /// Test long texts are split under the Telegram limit
    #[test]
    fn test_long_reply_is_split() {
        let text = "a".repeat(TELEGRAM_MESSAGE_LIMIT * 2 + 10);
        let chunks = split_message(&text, TELEGRAM_MESSAGE_LIMIT);

        assert_eq!(chunks.len(), 3);
        assert!(chunks
            .iter()
            .all(|chunk| chunk.chars().count() <= TELEGRAM_MESSAGE_LIMIT));
    }
}
