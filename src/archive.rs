//! Archive forwarding contract for accepted transcription photos.

use async_trait::async_trait;

use crate::errors::BotError;

/// Relays an accepted image to the fixed archive destination
///
/// Failures are returned to the caller; nothing is retried here.
#[async_trait]
pub trait ArchiveForwarder: Send + Sync {
    async fn forward(&self, image: Vec<u8>, caption: &str) -> Result<(), BotError>;
}

/// Retrieves the bytes of an image the user sent
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, file_id: &str) -> Result<Vec<u8>, BotError>;
}

/// Label attached to the `sequence`-th photo for a text code
pub fn archive_label(code: &str, sequence: u32) -> String {
    format!("{code}_{sequence}")
}

/// File name used when uploading a labelled photo
pub fn archive_file_name(label: &str) -> String {
    format!("{label}.jpg")
}
