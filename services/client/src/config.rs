//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. A missing or placeholder backend is not
//! an error: the app then runs against the stub backend.

use emotion_diary_core::DEFAULT_INACTIVITY_TIMEOUT;
use reqwest::Url;
use std::time::Duration;
use tracing::Level;

/// Values shipped in sample `.env` files that must never be treated as real.
const PLACEHOLDERS: [&str; 4] = [
    "your-supabase-url",
    "your-project-id",
    "your-supabase-anon-key",
    "your-anon-key",
];

const MANAGED_DOMAIN: &str = ".supabase.co";

/// Upper bound for `INACTIVITY_TIMEOUT_SECS`: one day.
const MAX_INACTIVITY_TIMEOUT_SECS: u64 = 86_400;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which backend the app talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelection {
    Rest { url: Url, key: String },
    Postgres { database_url: String },
    /// Why no live backend could be selected.
    Stub { reason: String },
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub inactivity_timeout: Duration,
    pub password_reset_redirect: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let inactivity_timeout = match var("INACTIVITY_TIMEOUT_SECS") {
            None => DEFAULT_INACTIVITY_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 && secs <= MAX_INACTIVITY_TIMEOUT_SECS => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "INACTIVITY_TIMEOUT_SECS".to_string(),
                        format!(
                            "'{}' is not a number of seconds between 1 and {}",
                            raw, MAX_INACTIVITY_TIMEOUT_SECS
                        ),
                    ))
                }
            },
        };

        Ok(Self {
            backend_url: var("DIARY_BACKEND_URL"),
            backend_key: var("DIARY_BACKEND_KEY"),
            database_url: var("DATABASE_URL"),
            log_level,
            inactivity_timeout,
            password_reset_redirect: var("PASSWORD_RESET_REDIRECT"),
        })
    }

    /// Picks the backend: a valid REST endpoint first, then Postgres, then the stub.
    pub fn backend(&self) -> BackendSelection {
        let rest_problem = match self.rest_endpoint() {
            Ok((url, key)) => return BackendSelection::Rest { url, key },
            Err(problem) => problem,
        };

        match &self.database_url {
            Some(database_url) => BackendSelection::Postgres {
                database_url: database_url.clone(),
            },
            None => BackendSelection::Stub {
                reason: rest_problem,
            },
        }
    }

    fn rest_endpoint(&self) -> Result<(Url, String), String> {
        let (Some(raw_url), Some(key)) = (&self.backend_url, &self.backend_key) else {
            return Err("DIARY_BACKEND_URL and DIARY_BACKEND_KEY are not set".to_string());
        };
        if is_placeholder(raw_url) || is_placeholder(key) {
            return Err("the backend settings still hold placeholder values".to_string());
        }

        let url = Url::parse(raw_url).map_err(|e| format!("'{}' is not a valid URL: {}", raw_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("'{}' is not an http(s) URL", raw_url));
        }
        let host = url.host_str().unwrap_or_default();
        let allowed = host.ends_with(MANAGED_DOMAIN) || host == "localhost" || host == "127.0.0.1";
        if !allowed {
            return Err(format!("'{}' is not a recognised backend host", host));
        }
        Ok((url, key.clone()))
    }
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.iter().any(|placeholder| value.contains(placeholder))
}
