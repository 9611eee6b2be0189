//! services/client/src/adapters/stub.rs
//!
//! The backend used when no live backend is configured. Session lookups report
//! "nobody signed in" so the app loads anonymously; everything else fails with
//! a configuration error instead of crashing.

use async_trait::async_trait;
use emotion_diary_core::ports::{
    AuthProvider, EntryStore, PortError, PortResult, ProfileStore, SessionSubscription,
};
use emotion_diary_core::{
    AuthSession, DiaryEntry, EntryPatch, EntryQuery, NewEntry, ProfileUpdate, User, UserProfile,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StubBackend {
    reason: String,
}

impl StubBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn unavailable<T>(&self) -> PortResult<T> {
        Err(PortError::Configuration(self.reason.clone()))
    }
}

#[async_trait]
impl AuthProvider for StubBackend {
    async fn current_session(&self) -> PortResult<Option<AuthSession>> {
        Ok(None)
    }

    async fn current_user(&self) -> PortResult<Option<User>> {
        Ok(None)
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::closed()
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> PortResult<AuthSession> {
        self.unavailable()
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _display_name: Option<&str>,
    ) -> PortResult<User> {
        self.unavailable()
    }

    async fn sign_out(&self) -> PortResult<()> {
        Ok(())
    }

    async fn request_password_reset(&self, _email: &str) -> PortResult<()> {
        self.unavailable()
    }

    async fn update_password(&self, _password: &str) -> PortResult<User> {
        self.unavailable()
    }
}

#[async_trait]
impl EntryStore for StubBackend {
    async fn insert_entry(&self, _user_id: Uuid, _entry: &NewEntry) -> PortResult<DiaryEntry> {
        self.unavailable()
    }

    async fn select_entries(&self, _query: &EntryQuery) -> PortResult<Vec<DiaryEntry>> {
        self.unavailable()
    }

    async fn update_entry(
        &self,
        _id: Uuid,
        _user_id: Uuid,
        _patch: &EntryPatch,
    ) -> PortResult<DiaryEntry> {
        self.unavailable()
    }

    async fn delete_entry(&self, _id: Uuid, _user_id: Uuid) -> PortResult<u64> {
        self.unavailable()
    }
}

#[async_trait]
impl ProfileStore for StubBackend {
    async fn get_profile(&self, _user_id: Uuid) -> PortResult<Option<UserProfile>> {
        self.unavailable()
    }

    async fn update_profile(
        &self,
        _user_id: Uuid,
        _update: &ProfileUpdate,
    ) -> PortResult<UserProfile> {
        self.unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_anonymous_and_refuses_everything_else() {
        let stub = StubBackend::new("no backend configured");

        assert_eq!(stub.current_session().await, Ok(None));
        assert_eq!(stub.sign_out().await, Ok(()));
        assert!(stub.subscribe().next().await.is_none());
        assert_eq!(
            stub.sign_in("me@example.com", "pw").await,
            Err(PortError::Configuration("no backend configured".into()))
        );
        assert!(matches!(
            stub.delete_entry(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(PortError::Configuration(_))
        ));
    }
}
