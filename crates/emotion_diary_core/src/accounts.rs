//! crates/emotion_diary_core/src/accounts.rs
//!
//! Account operations behind the sign-in, sign-up and password forms.
//! These never touch session store state: the store hears about a sign-in
//! through the backend's session-change push.

use crate::domain::{AuthSession, ProfileUpdate, User, UserProfile};
use crate::error::DiaryError;
use crate::ports::{AuthProvider, ProfileStore};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { auth, profiles }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<User, DiaryError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(DiaryError::InvalidInput("Password is required".into()));
        }
        let user = self
            .auth
            .sign_up(&email, password, full_name)
            .await
            .map_err(|e| {
                warn!("Sign-up failed: {}", e);
                DiaryError::auth(e)
            })?;
        info!("Registered user {}", user.id);
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, DiaryError> {
        let email = normalize_email(email)?;
        let session = self.auth.sign_in(&email, password).await.map_err(|e| {
            warn!("Sign-in failed: {}", e);
            DiaryError::auth(e)
        })?;
        info!("User {} signed in", session.user.id);
        Ok(session)
    }

    /// The user as confirmed by the backend; `None` when signed out.
    pub async fn current_user(&self) -> Result<Option<User>, DiaryError> {
        self.auth.current_user().await.map_err(DiaryError::auth)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), DiaryError> {
        let email = normalize_email(email)?;
        self.auth
            .request_password_reset(&email)
            .await
            .map_err(DiaryError::auth)?;
        info!("Password reset requested");
        Ok(())
    }

    pub async fn update_password(&self, password: &str) -> Result<User, DiaryError> {
        if password.is_empty() {
            return Err(DiaryError::InvalidInput("Password is required".into()));
        }
        self.auth
            .update_password(password)
            .await
            .map_err(DiaryError::auth)
    }

    /// A user without a profile row is not an error.
    pub async fn profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, DiaryError> {
        self.profiles
            .get_profile(user_id)
            .await
            .map_err(DiaryError::auth)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<UserProfile, DiaryError> {
        self.profiles
            .update_profile(user_id, &update)
            .await
            .map_err(DiaryError::auth)
    }
}

fn normalize_email(email: &str) -> Result<String, DiaryError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DiaryError::InvalidInput(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;

    fn service() -> (Arc<MemoryBackend>, AccountService) {
        let backend = Arc::new(MemoryBackend::new());
        let accounts = AccountService::new(backend.clone(), backend.clone());
        (backend, accounts)
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_pushes_a_session_change() {
        let (backend, accounts) = service();
        let mut changes = backend.subscribe();

        let user = accounts
            .sign_up(" me@example.com ", "secret", Some("Me"))
            .await
            .unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Me"));

        let session = accounts.sign_in("me@example.com", "secret").await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(changes.next().await.unwrap().session.unwrap().user.id, user.id);
        assert_eq!(accounts.current_user().await.unwrap().map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn bad_credentials_are_an_auth_error() {
        let (backend, accounts) = service();
        backend.register("me@example.com", "secret");

        let err = accounts.sign_in("me@example.com", "nope").await.unwrap_err();

        assert_eq!(err, DiaryError::Auth("Invalid login credentials".into()));
    }

    #[tokio::test]
    async fn malformed_email_never_reaches_the_backend() {
        let (_, accounts) = service();
        assert!(matches!(
            accounts.request_password_reset("not-an-email").await,
            Err(DiaryError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn password_update_needs_a_session() {
        let (backend, accounts) = service();
        backend.register("me@example.com", "old");

        assert_eq!(
            accounts.update_password("new").await.unwrap_err(),
            DiaryError::NotAuthenticated
        );

        accounts.sign_in("me@example.com", "old").await.unwrap();
        accounts.update_password("new").await.unwrap();
        assert!(accounts.sign_in("me@example.com", "old").await.is_err());
        assert!(accounts.sign_in("me@example.com", "new").await.is_ok());
    }

    #[tokio::test]
    async fn profile_updates_keep_untouched_fields() {
        let (backend, accounts) = service();
        let user = backend.register("me@example.com", "pw");

        let updated = accounts
            .update_profile(
                user.id,
                ProfileUpdate {
                    full_name: Some("Kim".into()),
                    avatar_url: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name.as_deref(), Some("Kim"));
        assert_eq!(updated.email.as_deref(), Some("me@example.com"));
        assert!(updated.updated_at > updated.created_at);
        assert!(accounts.profile(Uuid::new_v4()).await.unwrap().is_none());
    }
}
