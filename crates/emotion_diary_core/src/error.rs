//! crates/emotion_diary_core/src/error.rs
//!
//! The normalized error returned across the session, account and diary
//! boundaries. Every variant carries a message that is safe to show a user.

use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiaryError {
    /// The backend is missing or misconfigured; the app runs against the stub.
    #[error("The diary service is not configured: {0}")]
    Configuration(String),

    /// Sign-in, sign-up, sign-out or password operations failed.
    #[error("{0}")]
    Auth(String),

    /// An operation that needs a signed-in user was attempted anonymously.
    #[error("You need to sign in first.")]
    NotAuthenticated,

    #[error("Please answer every question before saving (missing: {})", .0.join(", "))]
    IncompleteAnswers(Vec<String>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A backend read or write failed; the caller may retry.
    #[error("Failed to {action}: {message}")]
    Persistence {
        action: &'static str,
        message: String,
    },

    #[error("Could not reach the server: {0}")]
    Network(String),
}

impl DiaryError {
    /// Normalizes a port error raised while performing `action` on entries or
    /// profiles.
    pub fn persistence(action: &'static str, err: PortError) -> Self {
        match err {
            PortError::Configuration(message) => DiaryError::Configuration(message),
            PortError::Network(message) => DiaryError::Network(message),
            PortError::Unauthorized => DiaryError::NotAuthenticated,
            other => DiaryError::Persistence {
                action,
                message: other.to_string(),
            },
        }
    }

    /// Normalizes a port error raised by the authentication provider.
    pub fn auth(err: PortError) -> Self {
        match err {
            PortError::Configuration(message) => DiaryError::Configuration(message),
            PortError::Network(message) => DiaryError::Network(message),
            PortError::Unauthorized => DiaryError::NotAuthenticated,
            PortError::Rejected(message) => DiaryError::Auth(message),
            other => DiaryError::Auth(other.to_string()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DiaryError::Persistence { .. } | DiaryError::Network(_)
        )
    }

    pub fn is_network(&self) -> bool {
        matches!(self, DiaryError::Network(_))
    }
}
