//! # Error Types Module
//!
//! Error taxonomy shared by the conversation engine and its collaborators.
//! Only configuration errors are fatal; everything else ends a single
//! conversation round with a user-facing notice.

/// Fatal startup errors raised while reading the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Recoverable errors raised while handling one conversation round
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BotError {
    /// The source folder holds no eligible text
    #[error("no text resources available")]
    NoResourceAvailable,

    /// A photo arrived for a user who never requested a text
    #[error("no session for user {user_id}")]
    SessionNotFound { user_id: u64 },

    /// Listing or downloading from the text source failed
    #[error("download failed: {0}")]
    Download(String),

    /// Fetching the incoming image or relaying it to the archive failed
    #[error("forward failed: {0}")]
    Forward(String),
}
