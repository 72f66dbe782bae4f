//! Telegram adapters for fetching user photos and relaying them to the archive chat

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, Recipient};
use tracing::{debug, info};

use crate::archive::{archive_file_name, ArchiveForwarder, ImageFetcher};
use crate::errors::BotError;

/// Archive forwarder posting photos to a fixed chat or channel
#[derive(Clone)]
pub struct TelegramArchive {
    bot: Bot,
    destination: Recipient,
}

impl TelegramArchive {
    pub fn new(bot: Bot, destination: Recipient) -> Self {
        Self { bot, destination }
    }
}

#[async_trait]
impl ImageFetcher for TelegramArchive {
    async fn fetch_image(&self, file_id: &str) -> Result<Vec<u8>, BotError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| BotError::Forward(format!("get_file failed: {e}")))?;

        let mut image = Vec::with_capacity(file.size as usize);
        self.bot
            .download_file(&file.path, &mut image)
            .await
            .map_err(|e| BotError::Forward(format!("image download failed: {e}")))?;

        debug!(file_id, bytes = image.len(), "Downloaded user image");
        Ok(image)
    }
}

#[async_trait]
impl ArchiveForwarder for TelegramArchive {
    async fn forward(&self, image: Vec<u8>, caption: &str) -> Result<(), BotError> {
        let photo = InputFile::memory(image).file_name(archive_file_name(caption));
        self.bot
            .send_photo(self.destination.clone(), photo)
            .caption(caption)
            .await
            .map_err(|e| BotError::Forward(format!("send_photo failed: {e}")))?;

        info!(caption, "Photo forwarded to archive");
        Ok(())
    }
}
