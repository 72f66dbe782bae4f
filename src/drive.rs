//! # Google Drive Module
//!
//! `TextSource` backed by the Drive v3 REST API, authenticated with a
//! service-account key through the OAuth2 JWT-bearer grant. Access is
//! read-only and scoped to one folder.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures_util::StreamExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ServiceAccountKey;
use crate::errors::BotError;
use crate::file_picker::{ResourceMeta, TextSource};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google expires them
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to sign service-account assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Drive API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("file content is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

impl From<DriveError> for BotError {
    fn from(err: DriveError) -> Self {
        BotError::Download(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

/// Drive listing query for plain-text, non-trashed children of `folder_id`
pub fn folder_query(folder_id: &str) -> String {
    let folder = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{folder}' in parents and mimeType='text/plain' and trashed = false")
}

pub struct GoogleDriveClient {
    http: Client,
    credentials: ServiceAccountKey,
    folder_id: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleDriveClient {
    pub fn new(credentials: ServiceAccountKey, folder_id: impl Into<String>) -> Self {
        Self::with_api_base(credentials, folder_id, DRIVE_API_BASE)
    }

    /// Client pointed at an alternative API root
    pub fn with_api_base(
        credentials: ServiceAccountKey,
        folder_id: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            credentials,
            folder_id: folder_id.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        }
    }

    #[cfg(test)]
    async fn seed_token(&self, value: &str) {
        *self.token.lock().await = Some(CachedToken {
            value: value.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        });
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, DriveError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.credentials.client_email,
            scope: DRIVE_READONLY_SCOPE,
            aud: &self.credentials.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    /// Return a valid access token, exchanging a fresh assertion when needed
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let assertion = self.signed_assertion(now)?;
        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;

        info!(expires_in = token.expires_in, "Obtained Drive access token");
        let fresh = CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        };
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn list_folder(&self) -> Result<Vec<ResourceMeta>, DriveError> {
        let token = self.access_token().await?;
        let query = folder_query(&self.folder_id);
        let mut resources = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/files", self.api_base))
                .bearer_auth(&token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "nextPageToken, files(id, name)"),
                ]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let page: FileList = check_status(request.send().await?).await?.json().await?;
            resources.extend(page.files.into_iter().map(|file| ResourceMeta {
                id: file.id,
                name: file.name,
            }));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(folder_id = %self.folder_id, count = resources.len(), "Listed Drive folder");
        Ok(resources)
    }

    async fn download(&self, file_id: &str) -> Result<String, DriveError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut chunks = 0usize;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
            chunks += 1;
        }

        debug!(file_id, bytes = body.len(), chunks, "Downloaded Drive file");
        Ok(String::from_utf8(body)?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%status, "Drive request rejected");
    Err(DriveError::Status { status, body })
}

#[async_trait]
impl TextSource for GoogleDriveClient {
    async fn list_available(&self) -> Result<Vec<ResourceMeta>, BotError> {
        Ok(self.list_folder().await?)
    }

    async fn fetch_content(&self, id: &str) -> Result<String, BotError> {
        Ok(self.download(id).await?)
    }
}
