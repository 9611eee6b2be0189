//! crates/emotion_diary_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the backend that stores sessions and entries, and of the
//! platform that delivers page events.

use crate::domain::{
    AuthSession, DiaryEntry, EntryPatch, EntryQuery, NewEntry, ProfileUpdate, SessionChange,
    User, UserProfile,
};
use crate::page::{Listener, ListenerId, PageEventKind};
use async_trait::async_trait;
use futures::Stream;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Backend is not configured: {0}")]
    Configuration(String),
    #[error("Network failure: {0}")]
    Network(String),
    /// The backend understood the request and refused it (bad credentials,
    /// duplicate account, weak password...).
    #[error("{0}")]
    Rejected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Session Change Subscription
//=========================================================================================

/// A live subscription to the backend's session-change pushes.
///
/// Dropping it unsubscribes. A subscription whose sender is gone yields `None`.
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    pub fn new(receiver: broadcast::Receiver<SessionChange>) -> Self {
        Self { receiver }
    }

    /// A subscription that is already closed; used by backends that never push.
    pub fn closed() -> Self {
        let (_, receiver) = broadcast::channel(1);
        Self { receiver }
    }

    /// Waits for the next change. Lagged notifications are skipped.
    pub async fn next(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Session subscription lagged, skipped {} change(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = SessionChange> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|change| (change, subscription))
        })
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The session held for this browser context, if still valid.
    async fn current_session(&self) -> PortResult<Option<AuthSession>>;

    /// The user of the current session as confirmed by the backend.
    async fn current_user(&self) -> PortResult<Option<User>>;

    /// Subscribes to pushed session changes.
    fn subscribe(&self) -> SessionSubscription;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> PortResult<User>;

    async fn sign_out(&self) -> PortResult<()>;

    async fn request_password_reset(&self, email: &str) -> PortResult<()>;

    async fn update_password(&self, password: &str) -> PortResult<User>;
}

#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn insert_entry(&self, user_id: Uuid, entry: &NewEntry) -> PortResult<DiaryEntry>;

    async fn select_entries(&self, query: &EntryQuery) -> PortResult<Vec<DiaryEntry>>;

    /// Applies `patch` to the entry `id` owned by `user_id`.
    /// Fails with `NotFound` when no such row exists for that owner.
    async fn update_entry(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &EntryPatch,
    ) -> PortResult<DiaryEntry>;

    /// Deletes the entry `id` owned by `user_id` and returns the affected row count.
    async fn delete_entry(&self, id: Uuid, user_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// A missing profile row is `Ok(None)`.
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> PortResult<UserProfile>;
}

/// Everything the application needs from its backend collaborator.
pub trait Backend: AuthProvider + EntryStore + ProfileStore {}

impl<T: AuthProvider + EntryStore + ProfileStore> Backend for T {}

/// The document/window event targets the activity monitor listens on.
pub trait EventTarget: Send + Sync {
    fn add_listener(&self, kind: PageEventKind, listener: Listener) -> ListenerId;

    /// Returns whether a listener was removed.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Whether the page is currently hidden.
    fn is_hidden(&self) -> bool;
}
