//! # Session Store Module
//!
//! Process-wide mapping from Telegram user to the text code they were given
//! and the number of photos accepted for it. Sessions live for the life of
//! the process and are only replaced by a new text request.

use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::UserId;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::BotError;

/// Per-user transcription session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Code of the text handed to the user
    pub assigned_code: String,
    /// Number of photos accepted since the text was handed out
    pub photo_count: u32,
}

impl Session {
    fn new(code: impl Into<String>) -> Self {
        Self {
            assigned_code: code.into(),
            photo_count: 0,
        }
    }

    /// Archive label for the most recently counted photo
    pub fn label(&self) -> String {
        crate::archive::archive_label(&self.assigned_code, self.photo_count)
    }
}

/// Shared, cloneable session store guarded by an async mutex
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<UserId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session for `user_id`, discarding any previous one
    pub async fn set(&self, user_id: UserId, code: impl Into<String>) -> Session {
        let session = Session::new(code);
        let previous = self
            .sessions
            .lock()
            .await
            .insert(user_id, session.clone());

        debug!(
            user_id = %user_id.0,
            code = %session.assigned_code,
            replaced = previous.is_some(),
            "Session assigned"
        );
        session
    }

    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        self.sessions.lock().await.get(&user_id).cloned()
    }

    /// Count one more accepted photo and return the new total
    pub async fn increment_photo(&self, user_id: UserId) -> Result<u32, BotError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&user_id)
            .ok_or(BotError::SessionNotFound { user_id: user_id.0 })?;

        session.photo_count += 1;
        Ok(session.photo_count)
    }

    /// Claim the next photo number under the lock and return the updated session
    ///
    /// Concurrent photos for one user always receive distinct numbers.
    pub async fn reserve_photo(&self, user_id: UserId) -> Result<Session, BotError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&user_id)
            .ok_or(BotError::SessionNotFound { user_id: user_id.0 })?;

        session.photo_count += 1;
        Ok(session.clone())
    }

    /// Give back a reservation whose upload failed
    ///
    /// Only the latest reservation of the same session can be returned;
    /// otherwise the number stays consumed and `false` is returned.
    pub async fn release_photo(&self, user_id: UserId, reserved: &Session) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&user_id) {
            Some(session) if *session == *reserved => {
                session.photo_count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Number of sessions held; inspection hook for operators and tests
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no session exists yet; inspection hook for operators and tests
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_starts_counter_at_zero() {
        let store = SessionStore::new();
        let session = store.set(UserId(1), "ABC123").await;

        assert_eq!(session.photo_count, 0);
        assert_eq!(store.get(UserId(1)).await, Some(session));
    }

    #[tokio::test]
    async fn test_increment_without_session_fails() {
        let store = SessionStore::new();

        let result = store.increment_photo(UserId(99)).await;
        assert_eq!(result, Err(BotError::SessionNotFound { user_id: 99 }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_session() {
        let store = SessionStore::new();
        store.set(UserId(5), "FIRST").await;
        store.increment_photo(UserId(5)).await.unwrap();
        store.increment_photo(UserId(5)).await.unwrap();

        store.set(UserId(5), "SECOND").await;
        let session = store.get(UserId(5)).await.unwrap();
        assert_eq!(session.assigned_code, "SECOND");
        assert_eq!(session.photo_count, 0);
        assert_eq!(session.label(), "SECOND_0");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_reserve_and_release_photo() {
        let store = SessionStore::new();
        store.set(UserId(8), "ABC").await;

        let first = store.reserve_photo(UserId(8)).await.unwrap();
        let second = store.reserve_photo(UserId(8)).await.unwrap();
        assert_eq!(first.label(), "ABC_1");
        assert_eq!(second.label(), "ABC_2");

        // An older reservation cannot be returned once a newer one exists
        assert!(!store.release_photo(UserId(8), &first).await);
        assert!(store.release_photo(UserId(8), &second).await);
        assert_eq!(store.get(UserId(8)).await.unwrap().photo_count, 1);

        let third = store.reserve_photo(UserId(8)).await.unwrap();
        assert_eq!(third.label(), "ABC_2");
    }

    #[tokio::test]
    async fn test_release_after_new_text_keeps_new_session() {
        let store = SessionStore::new();
        store.set(UserId(9), "OLD").await;
        let reserved = store.reserve_photo(UserId(9)).await.unwrap();

        store.set(UserId(9), "NEW").await;
        assert!(!store.release_photo(UserId(9), &reserved).await);
        assert_eq!(store.get(UserId(9)).await.unwrap().photo_count, 0);

        assert_eq!(
            store.reserve_photo(UserId(10)).await,
            Err(BotError::SessionNotFound { user_id: 10 })
        );
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = SessionStore::new();
        store.set(UserId(3), "CODE").await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_photo(UserId(3)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get(UserId(3)).await.unwrap().photo_count, 20);
    }
}
