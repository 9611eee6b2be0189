//! crates/emotion_diary_core/src/session_cell.rs
//!
//! The locally held backend session plus the channel its changes are pushed on.
//! Backend adapters own one and report every sign-in, sign-out and refresh
//! through it.

use crate::domain::{AuthEvent, AuthSession, SessionChange};
use crate::ports::SessionSubscription;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

const CHANGE_CAPACITY: usize = 16;

pub struct SessionCell {
    current: RwLock<Option<AuthSession>>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for SessionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCell {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            current: RwLock::new(None),
            changes,
        }
    }

    pub fn get(&self) -> Option<AuthSession> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the held session and pushes `event` to subscribers.
    pub fn set(&self, session: Option<AuthSession>, event: AuthEvent) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session.clone();
        // No receivers is fine: nobody is listening yet.
        let delivered = self.changes.send(SessionChange { event, session }).unwrap_or(0);
        debug!("Session change {:?} delivered to {} subscriber(s)", event, delivered);
    }

    /// Drops the held session, pushing `SignedOut` only if one was held.
    pub fn clear(&self) -> Option<AuthSession> {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            let _ = self.changes.send(SessionChange {
                event: AuthEvent::SignedOut,
                session: None,
            });
        }
        previous
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }
}
