//! # File Picker Module
//!
//! Chooses one text at random from a remote source and returns its full
//! content together with the code derived from its file name.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::errors::BotError;

/// Suffix stripped from a file name to obtain its code
pub const TEXT_SUFFIX: &str = ".txt";

/// Listing entry for a candidate text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceMeta {
    pub id: String,
    pub name: String,
}

/// A fully downloaded text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextResource {
    pub id: String,
    pub name: String,
    pub code: String,
    pub content: String,
}

/// Remote store of candidate texts
///
/// Implementations list only plain-text, non-trashed entries of their
/// configured folder, and `fetch_content` returns the whole decoded body or
/// an error, never a partial download.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn list_available(&self) -> Result<Vec<ResourceMeta>, BotError>;

    async fn fetch_content(&self, id: &str) -> Result<String, BotError>;
}

/// Derive the short code that labels a text and its photos
pub fn derive_code(name: &str) -> String {
    name.strip_suffix(TEXT_SUFFIX).unwrap_or(name).to_string()
}

/// Pick one available text uniformly at random and download it
///
/// An empty listing yields `BotError::NoResourceAvailable`.
pub async fn pick_random(source: &dyn TextSource) -> Result<TextResource, BotError> {
    let available = source.list_available().await?;
    debug!(candidates = available.len(), "Listed available texts");

    let chosen = available
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or(BotError::NoResourceAvailable)?;

    let content = source.fetch_content(&chosen.id).await?;
    let code = derive_code(&chosen.name);
    info!(file_id = %chosen.id, code = %code, chars = content.chars().count(), "Text picked");

    Ok(TextResource {
        id: chosen.id,
        name: chosen.name,
        code,
        content,
    })
}
