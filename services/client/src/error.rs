//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service's startup and
//! adapter plumbing. Nothing here escapes to the UI: the core services hand
//! out `DiaryError` instead.

use crate::config::ConfigError;
use emotion_diary_core::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents an error from the HTTP client talking to the managed backend.
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Maps a driver error from `sqlx` into the port vocabulary.
pub(crate) fn db_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("Row not found".to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => {
            PortError::Network(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Maps a transport error from `reqwest` into the port vocabulary.
pub(crate) fn http_error(e: reqwest::Error) -> PortError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        PortError::Network(e.to_string())
    } else if e.is_decode() {
        PortError::Unexpected(format!("Malformed backend response: {}", e))
    } else {
        PortError::Unexpected(e.to_string())
    }
}
