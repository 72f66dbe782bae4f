//! # Configuration Module
//!
//! Startup configuration read once from the environment. Any missing or
//! malformed value is a fatal `ConfigError`.

use std::env;
use std::net::SocketAddr;

use reqwest::Url;
use serde::Deserialize;
use teloxide::types::{ChatId, Recipient};

use crate::errors::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google service-account key, as exported from the cloud console
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Webhook settings; absent when the bot runs with long polling
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub url: Url,
    pub bind_addr: SocketAddr,
}

#[derive(Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub archive_chat: Recipient,
    pub folder_id: String,
    pub credentials: ServiceAccountKey,
    pub webhook: Option<WebhookConfig>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("archive_chat", &self.archive_chat)
            .field("folder_id", &self.folder_id)
            .field("credentials", &self.credentials)
            .field("webhook", &self.webhook)
            .finish_non_exhaustive()
    }
}

impl BotConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let bot_token = required("BOT_TOKEN")?;
        let archive_chat = parse_recipient(&required("ARCHIVE_CHAT_ID")?)?;
        let folder_id = required("READ_FOLDER_ID")?;
        let credentials = serde_json::from_str::<ServiceAccountKey>(&required("GOOGLE_CREDENTIALS")?)
            .map_err(|e| ConfigError::Invalid {
                var: "GOOGLE_CREDENTIALS",
                reason: e.to_string(),
            })?;

        let webhook = match lookup("WEBHOOK_URL").filter(|value| !value.trim().is_empty()) {
            Some(base) => {
                let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
                Some(WebhookConfig {
                    url: webhook_url(base.trim(), &bot_token)?,
                    bind_addr: bind.trim().parse().map_err(|e: std::net::AddrParseError| {
                        ConfigError::Invalid {
                            var: "BIND_ADDR",
                            reason: e.to_string(),
                        }
                    })?,
                })
            }
            None => None,
        };

        Ok(Self {
            bot_token,
            archive_chat,
            folder_id,
            credentials,
            webhook,
        })
    }
}

/// Accepts a numeric chat id or a public `@channel` username
fn parse_recipient(value: &str) -> Result<Recipient, ConfigError> {
    if value.starts_with('@') {
        return Ok(Recipient::ChannelUsername(value.to_string()));
    }
    value
        .parse::<i64>()
        .map(|id| Recipient::Id(ChatId(id)))
        .map_err(|e| ConfigError::Invalid {
            var: "ARCHIVE_CHAT_ID",
            reason: e.to_string(),
        })
}

/// Webhook endpoint: the public base URL with the bot token as its path
fn webhook_url(base: &str, token: &str) -> Result<Url, ConfigError> {
    let url = format!("{}/{}", base.trim_end_matches('/'), token);
    Url::parse(&url).map_err(|e| ConfigError::Invalid {
        var: "WEBHOOK_URL",
        reason: e.to_string(),
    })
}
