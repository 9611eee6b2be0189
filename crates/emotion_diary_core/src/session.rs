//! crates/emotion_diary_core/src/session.rs
//!
//! The session store: single source of truth for who is signed in. It owns the
//! inactivity timer and the activity monitor, and follows the backend's
//! session-change pushes for as long as it is subscribed.
//!
//! Lifecycle: `Uninitialized -> Loading -> {Authenticated, Anonymous}`, and
//! `Authenticated -> Anonymous` on explicit sign-out, inactivity timeout or a
//! pushed session loss.

use crate::domain::{SessionChange, User};
use crate::error::DiaryError;
use crate::monitor::{ActivityMonitor, MonitorEvent, MonitorSink};
use crate::ports::{AuthProvider, EventTarget};
use crate::timer::InactivityTimer;
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

/// What the UI renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub user: Option<User>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated && self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Uninitialized | SessionStatus::Loading
        )
    }
}

pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    page: Arc<dyn EventTarget>,
    timeout: Duration,
    timer: InactivityTimer,
    monitor: Mutex<ActivityMonitor>,
    state: watch::Sender<SessionSnapshot>,
    subscription: Mutex<Option<CancellationToken>>,
    this: Weak<SessionStore>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        page: Arc<dyn EventTarget>,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<SessionStore>| {
            let on_timeout = this.clone();
            let timer = InactivityTimer::new(timeout, move || {
                if let Some(store) = on_timeout.upgrade() {
                    store.handle_inactivity_timeout();
                }
            });
            let (state, _) = watch::channel(SessionSnapshot {
                status: SessionStatus::Uninitialized,
                user: None,
            });

            Self {
                monitor: Mutex::new(ActivityMonitor::new(Arc::clone(&page))),
                auth,
                page,
                timeout,
                timer,
                state,
                subscription: Mutex::new(None),
                this: this.clone(),
            }
        })
    }

    //=====================================================================================
    // Queries
    //=====================================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Session state changes, for the UI.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Whole seconds until automatic sign-out; always 0 when signed out.
    pub fn time_until_logout(&self) -> u64 {
        if self.is_authenticated() {
            self.timer.remaining_secs()
        } else {
            0
        }
    }

    /// The per-second countdown published while signed in and visible.
    pub fn countdown(&self) -> watch::Receiver<u64> {
        self.timer.countdown()
    }

    pub fn timer(&self) -> &InactivityTimer {
        &self.timer
    }

    pub fn monitor_attached(&self) -> bool {
        lock(&self.monitor).is_attached()
    }

    //=====================================================================================
    // Lifecycle
    //=====================================================================================

    /// Restores any existing backend session, then follows pushed session
    /// changes. Calling it again replaces the previous subscription.
    pub async fn initialize(&self) {
        self.state.send_modify(|state| state.status = SessionStatus::Loading);

        match self.auth.current_session().await {
            Ok(Some(session)) => {
                info!("Restored session for user {}", session.user.id);
                self.apply_user(Some(session.user));
            }
            Ok(None) => self.apply_user(None),
            Err(e) => {
                error!("Auth initialization error: {}", e);
                self.apply_user(None);
            }
        }

        self.subscribe_to_backend();
    }

    /// Restarts the inactivity countdown after user activity. Ignored unless
    /// signed in with the page visible; activity while paused is dropped.
    ///
    /// A sign-out or hide racing with this call is safe: the timer only
    /// restarts a running countdown, checked under its own lock.
    pub fn reset_inactivity_timer(&self) {
        if !self.is_authenticated() || self.page.is_hidden() {
            return;
        }
        self.timer.reset();
    }

    /// Signs out at the user's request. Local state ends up anonymous whether
    /// or not the backend call succeeds.
    pub async fn sign_out(&self) -> Result<(), DiaryError> {
        let result = self.auth.sign_out().await;
        self.apply_user(None);
        result.map_err(|e| {
            warn!("Sign-out failed on the backend: {}", e);
            DiaryError::auth(e)
        })
    }

    /// Stops the timer, detaches the activity monitor and zeroes the countdown.
    pub fn cleanup(&self) {
        self.timer.stop();
        lock(&self.monitor).detach();
        debug!("Session tracking cleaned up");
    }

    /// Cleans up and stops following the backend.
    pub fn dispose(&self) {
        if let Some(token) = lock(&self.subscription).take() {
            token.cancel();
        }
        self.cleanup();
    }

    //=====================================================================================
    // Transitions
    //=====================================================================================

    fn apply_user(&self, user: Option<User>) {
        match user {
            Some(user) => {
                let previous = self.snapshot();
                let newly_signed_in = !previous.is_authenticated()
                    || previous.user.as_ref().map(|u| u.id) != Some(user.id);
                self.state.send_replace(SessionSnapshot {
                    status: SessionStatus::Authenticated,
                    user: Some(user),
                });
                if newly_signed_in {
                    self.start_tracking();
                }
            }
            None => {
                let was_authenticated = self.is_authenticated();
                self.state.send_replace(SessionSnapshot {
                    status: SessionStatus::Anonymous,
                    user: None,
                });
                self.cleanup();
                if was_authenticated {
                    info!("Signed out");
                }
            }
        }
    }

    fn start_tracking(&self) {
        self.timer.start(self.timeout);
        if self.page.is_hidden() {
            self.timer.pause();
        }

        let store = self.this.clone();
        let sink: MonitorSink = Arc::new(move |event| {
            if let Some(store) = store.upgrade() {
                store.handle_monitor_event(event);
            }
        });
        lock(&self.monitor).attach(sink);
        info!(
            "Inactivity tracking started ({}s timeout)",
            self.timeout.as_secs()
        );
    }

    fn handle_monitor_event(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::Activity => self.reset_inactivity_timer(),
            MonitorEvent::Visibility { hidden: true } | MonitorEvent::Focus { focused: false } => {
                self.timer.pause()
            }
            MonitorEvent::Visibility { hidden: false } | MonitorEvent::Focus { focused: true } => {
                if self.is_authenticated() {
                    self.timer.resume();
                }
            }
        }
    }

    fn handle_session_change(&self, change: SessionChange) {
        debug!("Session change pushed: {:?}", change.event);
        self.apply_user(change.session.map(|session| session.user));
    }

    /// Local state is cleared first; the backend sign-out is still issued so the
    /// server-side session is invalidated, and its failure is only logged.
    fn handle_inactivity_timeout(&self) {
        if !self.is_authenticated() {
            return;
        }
        info!("Signing out after inactivity");
        self.apply_user(None);

        let auth = Arc::clone(&self.auth);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = auth.sign_out().await {
                        error!("Automatic sign-out failed: {}", e);
                    }
                });
            }
            Err(_) => warn!("No async runtime available, backend sign-out skipped"),
        }
    }

    fn subscribe_to_backend(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.subscription).replace(token.clone()) {
            previous.cancel();
        }

        let changes = self.auth.subscribe().into_stream();
        let store = self.this.clone();
        let task = async move {
            tokio::pin!(changes);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    change = changes.next() => {
                        let (Some(change), Some(store)) = (change, store.upgrade()) else {
                            break;
                        };
                        store.handle_session_change(change);
                    }
                }
            }
            debug!("Session change subscription ended");
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => warn!("No async runtime available, session changes will not be followed"),
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.subscription).take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{PageEvent, PageEvents};
    use crate::testing::MemoryBackend;
    use std::sync::atomic::Ordering;
    use tokio::time::sleep;

    const TIMEOUT: Duration = Duration::from_secs(600);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    struct Harness {
        backend: Arc<MemoryBackend>,
        page: Arc<PageEvents>,
        store: Arc<SessionStore>,
    }

    fn harness() -> Harness {
        let backend = Arc::new(MemoryBackend::new());
        let page = Arc::new(PageEvents::new());
        let store = SessionStore::new(backend.clone(), page.clone(), TIMEOUT);
        Harness {
            backend,
            page,
            store,
        }
    }

    /// Lets spawned tasks (subscription, sign-out) run to completion.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn starts_anonymous_without_a_session() {
        let h = harness();
        assert_eq!(h.store.status(), SessionStatus::Uninitialized);
        assert!(h.store.snapshot().is_loading());

        h.store.initialize().await;

        assert_eq!(h.store.status(), SessionStatus::Anonymous);
        assert_eq!(h.store.time_until_logout(), 0);
        assert!(!h.store.monitor_attached());
        assert_eq!(h.page.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restored_session_starts_tracking() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);

        h.store.initialize().await;

        assert_eq!(h.store.status(), SessionStatus::Authenticated);
        assert_eq!(h.store.user(), Some(user));
        assert_eq!(h.store.time_until_logout(), 600);
        assert!(h.store.monitor_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_failure_lands_in_anonymous() {
        let h = harness();
        h.backend.fail_session_lookup.store(true, Ordering::SeqCst);

        h.store.initialize().await;

        assert_eq!(h.store.status(), SessionStatus::Anonymous);
    }

    #[tokio::test(start_paused = true)]
    async fn pushed_sign_in_and_sign_out_drive_the_store() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.store.initialize().await;

        h.backend.sign_in("me@example.com", "pw").await.unwrap();
        settle().await;
        assert_eq!(h.store.user().map(|u| u.id), Some(user.id));
        assert!(h.store.monitor_attached());

        h.backend.sign_out().await.unwrap();
        settle().await;
        assert_eq!(h.store.status(), SessionStatus::Anonymous);
        assert!(!h.store.monitor_attached());
        assert_eq!(*h.store.countdown().borrow(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_resets_the_countdown() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);
        h.store.initialize().await;

        sleep(secs(300)).await;
        assert_eq!(h.store.time_until_logout(), 300);
        h.page.dispatch(PageEvent::KeyPress);

        assert_eq!(h.store.time_until_logout(), 600);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_page_pauses_and_ignores_activity() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);
        h.store.initialize().await;

        sleep(secs(100)).await;
        h.page.dispatch(PageEvent::VisibilityChange { hidden: true });
        sleep(secs(500)).await;
        h.page.dispatch(PageEvent::Click);
        assert!(h.store.timer().is_paused());
        assert_eq!(h.store.time_until_logout(), 500);

        h.page.dispatch(PageEvent::VisibilityChange { hidden: false });
        assert!(!h.store.timer().is_paused());
        assert_eq!(h.store.time_until_logout(), 500);
        assert!(h.store.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn blur_and_focus_pause_and_resume() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);
        h.store.initialize().await;

        h.page.dispatch(PageEvent::Blur);
        sleep(secs(900)).await;
        assert!(h.store.is_authenticated());

        h.page.dispatch(PageEvent::Focus);
        assert_eq!(h.store.time_until_logout(), 600);
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_signs_out_even_when_the_backend_call_fails() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);
        h.backend.fail_sign_out.store(true, Ordering::SeqCst);
        h.store.initialize().await;

        sleep(secs(601)).await;
        settle().await;

        assert_eq!(h.store.status(), SessionStatus::Anonymous);
        assert_eq!(h.store.time_until_logout(), 0);
        assert_eq!(h.page.listener_count(), 0);
        assert_eq!(h.backend.sign_out_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn returning_to_an_exhausted_timer_signs_out() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);
        h.store.initialize().await;

        sleep(secs(200)).await;
        h.page.dispatch(PageEvent::VisibilityChange { hidden: true });
        h.store.timer().bank_elapsed(TIMEOUT);
        assert!(h.store.is_authenticated());

        h.page.dispatch(PageEvent::VisibilityChange { hidden: false });
        settle().await;

        assert_eq!(h.store.status(), SessionStatus::Anonymous);
        assert_eq!(h.store.time_until_logout(), 0);
        assert!(!h.store.monitor_attached());
        assert_eq!(h.page.listener_count(), 0);
        assert_eq!(h.backend.sign_out_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_after_sign_out_does_not_restart_the_countdown() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);
        h.store.initialize().await;
        h.store.sign_out().await.unwrap();

        h.store.timer().reset();
        h.store.reset_inactivity_timer();

        assert_eq!(h.store.timer().phase(), crate::timer::TimerPhase::Idle);
        assert_eq!(*h.store.countdown().borrow(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_sign_out_reports_failure_but_clears_state() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);
        h.store.initialize().await;
        h.backend.fail_sign_out.store(true, Ordering::SeqCst);

        let result = h.store.sign_out().await;

        assert!(matches!(result, Err(DiaryError::Network(_))));
        assert_eq!(h.store.status(), SessionStatus::Anonymous);
        assert!(!h.store.monitor_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn reinitializing_does_not_duplicate_listeners() {
        let h = harness();
        let user = h.backend.register("me@example.com", "pw");
        h.backend.restore_session(&user);

        h.store.initialize().await;
        h.store.initialize().await;
        settle().await;

        assert_eq!(h.page.listener_count(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_following_the_backend() {
        let h = harness();
        h.backend.register("me@example.com", "pw");
        h.store.initialize().await;
        h.store.dispose();
        settle().await;

        h.backend.sign_in("me@example.com", "pw").await.unwrap();
        settle().await;

        assert_eq!(h.store.status(), SessionStatus::Anonymous);
    }
}
