//! # Conversation Module
//!
//! The per-user conversation as an explicit state machine. Each incoming
//! message is turned into an [`Event`]; [`Conversation::handle`] applies it to
//! the current [`ConversationState`] and returns the next state together with
//! the replies to send. Nothing in here talks to Telegram directly, so every
//! transition can be exercised with in-memory collaborators.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use teloxide::types::UserId;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveForwarder, ImageFetcher};
use crate::errors::BotError;
use crate::file_picker::{pick_random, TextSource};
use crate::messages::Messages;
use crate::session::SessionStore;

/// Conversation state stored per chat
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingPhoto,
}

/// One size variant of an image sent by the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: u32,
}

impl PhotoVariant {
    fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Pick the highest-resolution variant, preferring larger files on ties
pub fn best_variant(variants: &[PhotoVariant]) -> Option<&PhotoVariant> {
    variants
        .iter()
        .max_by_key(|variant| (variant.pixels(), variant.file_size))
}

/// Input to the conversation state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// `/start`, carrying the user's first name for the greeting
    Start { first_name: String },
    /// `/gettext`
    GetText,
    /// A message carrying an image in one or more sizes
    Image(Vec<PhotoVariant>),
    /// Any other message
    Other,
}

/// Commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "получить текст для переписывания")]
    Gettext,
}

impl Event {
    /// Classify a text message addressed to `bot_name`
    pub fn from_text(text: &str, first_name: &str, bot_name: &str) -> Self {
        match Command::parse(text, bot_name) {
            Ok(Command::Start) => Event::Start {
                first_name: first_name.to_string(),
            },
            Ok(Command::Gettext) => Event::GetText,
            Err(_) => Event::Other,
        }
    }
}

/// Outcome of applying one event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: ConversationState,
    pub replies: Vec<String>,
}

impl Transition {
    fn to(next: ConversationState) -> Self {
        Self {
            next,
            replies: Vec::new(),
        }
    }

    fn reply(mut self, text: impl Into<String>) -> Self {
        self.replies.push(text.into());
        self
    }
}

/// Conversation engine shared by all chats
pub struct Conversation {
    sessions: SessionStore,
    texts: Arc<dyn TextSource>,
    images: Arc<dyn ImageFetcher>,
    archive: Arc<dyn ArchiveForwarder>,
    messages: Arc<Messages>,
}

impl Conversation {
    pub fn new(
        sessions: SessionStore,
        texts: Arc<dyn TextSource>,
        images: Arc<dyn ImageFetcher>,
        archive: Arc<dyn ArchiveForwarder>,
        messages: Arc<Messages>,
    ) -> Self {
        Self {
            sessions,
            texts,
            images,
            archive,
            messages,
        }
    }

    /// Session store backing this conversation; inspection hook for operators and tests
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Apply `event` for `user_id` in `state`
    ///
    /// Collaborator failures never escape: they become an apology reply and
    /// the round ends in `Idle`.
    pub async fn handle(
        &self,
        user_id: UserId,
        state: &ConversationState,
        event: Event,
    ) -> Transition {
        debug!(user_id = %user_id.0, ?state, ?event, "Handling conversation event");

        let transition = match (state, event) {
            (_, Event::Start { first_name }) => Transition::to(ConversationState::Idle).reply(
                self.messages
                    .get_with_args("welcome", &[("name", first_name.as_str())]),
            ),
            (_, Event::GetText) => self.hand_out_text(user_id).await,
            (ConversationState::AwaitingPhoto, Event::Image(variants)) => {
                self.accept_photo(user_id, &variants).await
            }
            (ConversationState::Idle, Event::Image(_)) => {
                debug!(user_id = %user_id.0, "Photo received outside of a text round");
                Transition::to(ConversationState::Idle).reply(self.messages.get("get-text-first"))
            }
            (ConversationState::AwaitingPhoto, Event::Other) => {
                Transition::to(ConversationState::AwaitingPhoto)
                    .reply(self.messages.get("send-image"))
            }
            (ConversationState::Idle, Event::Other) => Transition::to(ConversationState::Idle),
        };

        debug!(user_id = %user_id.0, next = ?transition.next, replies = transition.replies.len(), "Conversation transition");
        transition
    }

    async fn hand_out_text(&self, user_id: UserId) -> Transition {
        match pick_random(self.texts.as_ref()).await {
            Ok(text) => {
                self.sessions.set(user_id, text.code.clone()).await;
                info!(user_id = %user_id.0, code = %text.code, "Text handed out");

                let with_code = format!(
                    "{}\n\n{}",
                    text.content,
                    self.messages
                        .get_with_args("your-code", &[("code", text.code.as_str())])
                );
                Transition::to(ConversationState::AwaitingPhoto)
                    .reply(with_code)
                    .reply(self.messages.get("photo-request"))
            }
            Err(BotError::NoResourceAvailable) => {
                warn!(user_id = %user_id.0, "No texts available in source folder");
                Transition::to(ConversationState::Idle).reply(self.messages.get("no-texts"))
            }
            Err(e) => {
                error!(user_id = %user_id.0, error = %e, "Failed to fetch text");
                Transition::to(ConversationState::Idle).reply(self.messages.get("download-failed"))
            }
        }
    }

    async fn accept_photo(&self, user_id: UserId, variants: &[PhotoVariant]) -> Transition {
        let Some(photo) = best_variant(variants) else {
            return Transition::to(ConversationState::AwaitingPhoto)
                .reply(self.messages.get("send-image"));
        };

        let reserved = match self.sessions.reserve_photo(user_id).await {
            Ok(session) => session,
            Err(e) => {
                debug!(user_id = %user_id.0, error = %e, "Photo received without a session");
                return Transition::to(ConversationState::Idle)
                    .reply(self.messages.get("get-text-first"));
            }
        };

        let label = reserved.label();
        match self.relay(&photo.file_id, &label).await {
            Ok(()) => {
                info!(user_id = %user_id.0, label = %label, count = reserved.photo_count, "Photo archived");
                Transition::to(ConversationState::Idle).reply(self.messages.get("upload-success"))
            }
            Err(e) => {
                let released = self.sessions.release_photo(user_id, &reserved).await;
                error!(user_id = %user_id.0, label = %label, released, error = %e, "Failed to archive photo");
                Transition::to(ConversationState::Idle).reply(self.messages.get("upload-failed"))
            }
        }
    }

    async fn relay(&self, file_id: &str, label: &str) -> Result<(), BotError> {
        let image = self.images.fetch_image(file_id).await?;
        self.archive.forward(image, label).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(file_id: &str, width: u32, height: u32, file_size: u32) -> PhotoVariant {
        PhotoVariant {
            file_id: file_id.to_string(),
            width,
            height,
            file_size,
        }
    }

    const BOT: &str = "handwriting_bot";

    #[test]
    fn test_command_parsing() {
        assert_eq!(
            Event::from_text("/start", "Anna", BOT),
            Event::Start {
                first_name: "Anna".to_string()
            }
        );
        assert_eq!(Event::from_text("/gettext", "Anna", BOT), Event::GetText);
        assert_eq!(Event::from_text("/gettext@handwriting_bot", "Anna", BOT), Event::GetText);
        assert_eq!(Event::from_text("/gettext@other_bot", "Anna", BOT), Event::Other);
        assert_eq!(Event::from_text("/help", "Anna", BOT), Event::Other);
        assert_eq!(Event::from_text("gettext", "Anna", BOT), Event::Other);
        assert_eq!(Event::from_text("", "Anna", BOT), Event::Other);
    }

    #[test]
    fn test_best_variant_prefers_resolution() {
        let variants = vec![
            variant("small", 90, 60, 1_000),
            variant("large", 1280, 853, 90_000),
            variant("medium", 320, 213, 12_000),
        ];
        assert_eq!(best_variant(&variants).unwrap().file_id, "large");
        assert!(best_variant(&[]).is_none());
    }

    #[test]
    fn test_best_variant_breaks_ties_on_size() {
        let variants = vec![variant("doc-a", 0, 0, 500), variant("doc-b", 0, 0, 900)];
        assert_eq!(best_variant(&variants).unwrap().file_id, "doc-b");
    }

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(ConversationState::default(), ConversationState::Idle);
    }
}
