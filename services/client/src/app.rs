//! services/client/src/app.rs
//!
//! Startup wiring: selects a backend from the configuration and builds the
//! session store, account service and diary access layer on top of it.

use crate::adapters::{PgBackend, RestBackend, StubBackend};
use crate::config::{BackendSelection, Config};
use crate::error::ClientError;
use crate::telemetry;
use emotion_diary_core::{
    AccountService, Backend, DiaryService, EventTarget, PageEvents, SessionStore,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Rest,
    Postgres,
    Stub,
}

/// The assembled application. One per browser context.
pub struct App {
    pub config: Config,
    /// Where the platform binding dispatches DOM events.
    pub page: Arc<PageEvents>,
    pub session: Arc<SessionStore>,
    pub accounts: AccountService,
    pub diary: DiaryService,
    kind: BackendKind,
}

impl App {
    /// Loads configuration, installs logging and bootstraps.
    pub async fn from_env() -> Result<Self, ClientError> {
        let config = Config::from_env()?;
        telemetry::init(config.log_level);
        info!("Configuration loaded. Starting client...");
        Ok(Self::bootstrap(config).await)
    }

    /// Never fails: a backend that cannot be reached is replaced by the stub,
    /// so the app still loads, anonymously.
    pub async fn bootstrap(config: Config) -> Self {
        match config.backend() {
            BackendSelection::Rest { url, key } => {
                info!("Using managed backend at {}", url);
                match RestBackend::new(url, key, config.password_reset_redirect.clone()) {
                    Ok(backend) => Self::assemble(config, Arc::new(backend), BackendKind::Rest),
                    Err(e) => Self::degraded(config, e),
                }
            }
            BackendSelection::Postgres { database_url } => {
                info!("Using Postgres backend");
                match PgBackend::connect(&database_url).await {
                    Ok(backend) => Self::assemble(config, Arc::new(backend), BackendKind::Postgres),
                    Err(e) => Self::degraded(config, e),
                }
            }
            BackendSelection::Stub { reason } => {
                warn!("Diary backend not configured ({}), running without one", reason);
                Self::assemble(config, Arc::new(StubBackend::new(reason)), BackendKind::Stub)
            }
        }
    }

    fn degraded(config: Config, e: ClientError) -> Self {
        error!("Backend initialization failed, running without one: {}", e);
        let stub = StubBackend::new(format!("Backend initialization failed: {}", e));
        Self::assemble(config, Arc::new(stub), BackendKind::Stub)
    }

    /// Wires the core services over `backend`.
    pub fn assemble<B: Backend + 'static>(config: Config, backend: Arc<B>, kind: BackendKind) -> Self {
        let page = Arc::new(PageEvents::new());
        let target: Arc<dyn EventTarget> = page.clone();
        let session = SessionStore::new(backend.clone(), target, config.inactivity_timeout);
        let accounts = AccountService::new(backend.clone(), backend.clone());
        let diary = DiaryService::new(backend.clone(), backend);

        Self {
            config,
            page,
            session,
            accounts,
            diary,
            kind,
        }
    }

    /// Restores any existing session and starts following the backend.
    pub async fn start(&self) {
        self.session.initialize().await;
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn shutdown(&self) {
        self.session.dispose();
    }
}
