//! crates/emotion_diary_core/src/network.rs
//!
//! Connectivity tracking. Turns platform online/offline signals and failed
//! backend calls into notices for the user, escalating once repeated failures
//! pile up within a short window.

use crate::error::DiaryError;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

pub const RETRY_WINDOW: Duration = Duration::from_secs(30);
pub const MAX_ATTEMPTS: u32 = 3;

const NETWORK_HINTS: [&str; 4] = ["fetch", "network", "connection", "timeout"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkNotice {
    Offline,
    Restored,
    Retrying { attempt: u32, max: u32 },
    GiveUp,
}

impl NetworkNotice {
    pub fn message(&self) -> String {
        match self {
            NetworkNotice::Offline => "Connection lost. Please check your internet connection.".into(),
            NetworkNotice::Restored => "Your internet connection has been restored.".into(),
            NetworkNotice::Retrying { attempt, max } => {
                format!("Could not reach the server. (retry {}/{})", attempt, max)
            }
            NetworkNotice::GiveUp => "Could not reach the server. Check your connection and reload the page.".into(),
        }
    }
}

#[derive(Debug)]
pub struct NetworkTracker {
    online: bool,
    has_error: bool,
    attempts: u32,
    last_failure: Option<Instant>,
}

impl Default for NetworkTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkTracker {
    pub fn new() -> Self {
        Self {
            online: true,
            has_error: false,
            attempts: 0,
            last_failure: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn set_offline(&mut self) -> NetworkNotice {
        self.online = false;
        warn!("Platform reported offline");
        NetworkNotice::Offline
    }

    /// Returns a notice only when the platform was previously offline.
    pub fn set_online(&mut self) -> Option<NetworkNotice> {
        let was_offline = !self.online;
        self.online = true;
        self.has_error = false;
        if was_offline {
            info!("Platform connectivity restored");
            Some(NetworkNotice::Restored)
        } else {
            None
        }
    }

    /// Classifies a failed call. Returns `None` when it is not network related.
    pub fn record_failure(&mut self, message: &str) -> Option<NetworkNotice> {
        let lowered = message.to_lowercase();
        let network_related =
            !self.online || NETWORK_HINTS.iter().any(|hint| lowered.contains(hint));
        if !network_related {
            return None;
        }
        Some(self.count_failure(message))
    }

    /// Convenience for normalized errors; anything classed as `Network` counts
    /// regardless of its message.
    pub fn record_error(&mut self, err: &DiaryError) -> Option<NetworkNotice> {
        match err {
            DiaryError::Network(message) => Some(self.count_failure(message)),
            other => self.record_failure(&other.to_string()),
        }
    }

    fn count_failure(&mut self, message: &str) -> NetworkNotice {
        let now = Instant::now();
        let within_window = self
            .last_failure
            .is_some_and(|last| now.saturating_duration_since(last) <= RETRY_WINDOW);
        self.attempts = if within_window { self.attempts + 1 } else { 1 };
        self.last_failure = Some(now);
        self.has_error = true;

        if self.attempts <= MAX_ATTEMPTS {
            warn!("Network failure {}/{}: {}", self.attempts, MAX_ATTEMPTS, message);
            NetworkNotice::Retrying {
                attempt: self.attempts,
                max: MAX_ATTEMPTS,
            }
        } else {
            warn!("Giving up after {} network failures: {}", self.attempts, message);
            NetworkNotice::GiveUp
        }
    }

    pub fn reset(&mut self) {
        self.has_error = false;
        self.attempts = 0;
        self.last_failure = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[test]
    fn unrelated_failures_are_ignored() {
        let mut tracker = NetworkTracker::new();
        assert_eq!(tracker.record_failure("duplicate key value"), None);
        assert!(!tracker.has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn escalates_after_three_failures_within_the_window() {
        let mut tracker = NetworkTracker::new();

        for attempt in 1..=MAX_ATTEMPTS {
            assert_eq!(
                tracker.record_failure("TypeError: Failed to fetch"),
                Some(NetworkNotice::Retrying {
                    attempt,
                    max: MAX_ATTEMPTS
                })
            );
            advance(Duration::from_secs(5)).await;
        }
        assert_eq!(
            tracker.record_failure("connection refused"),
            Some(NetworkNotice::GiveUp)
        );
        assert!(tracker.has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_outside_the_window_start_over() {
        let mut tracker = NetworkTracker::new();
        tracker.record_failure("network down");
        tracker.record_failure("network down");
        advance(Duration::from_secs(31)).await;

        assert_eq!(
            tracker.record_failure("request timeout"),
            Some(NetworkNotice::Retrying { attempt: 1, max: 3 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn offline_makes_any_failure_count() {
        let mut tracker = NetworkTracker::new();
        assert_eq!(tracker.set_offline(), NetworkNotice::Offline);
        assert!(tracker.record_failure("something odd").is_some());

        assert_eq!(tracker.set_online(), Some(NetworkNotice::Restored));
        assert_eq!(tracker.set_online(), None);
        assert!(!tracker.has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn normalized_network_errors_always_count() {
        let mut tracker = NetworkTracker::new();
        let notice = tracker.record_error(&DiaryError::Network("502 Bad Gateway".into()));
        assert_eq!(notice, Some(NetworkNotice::Retrying { attempt: 1, max: 3 }));
        // No hint word in the message, still counted.
        let notice = tracker.record_error(&DiaryError::Network("Service Unavailable".into()));
        assert_eq!(notice, Some(NetworkNotice::Retrying { attempt: 2, max: 3 }));
        assert_eq!(tracker.record_failure("Service Unavailable"), None);
        assert_eq!(tracker.record_error(&DiaryError::NotAuthenticated), None);

        tracker.reset();
        assert_eq!(tracker.attempts(), 0);
        assert!(!tracker.has_error());
    }
}
