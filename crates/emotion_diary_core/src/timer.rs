//! crates/emotion_diary_core/src/timer.rs
//!
//! The inactivity timer engine.
//!
//! Elapsed time is accounted in segments: every pause banks the time since the
//! last reference point, and a resume starts a fresh segment from "now". While a
//! segment runs, a single task drives both the one-second countdown and the
//! timeout deadline, so the two can never race each other.
//!
//! Every scheduled segment carries a generation number. `pause`, `stop`, a new
//! `start` and an expiry all bump the generation under the state lock, so a
//! segment task that wakes after being superseded finds a stale generation and
//! does nothing. Once one of those calls returns, no older callback can fire.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default inactivity timeout: ten minutes.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(600);

const TICK: Duration = Duration::from_secs(1);

/// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// Never started, stopped, or expired.
    Idle,
    Running,
    Paused,
}

struct TimerState {
    timeout: Duration,
    /// Start of the current running segment.
    reference: Option<Instant>,
    /// Elapsed time banked by earlier segments.
    banked: Duration,
    phase: TimerPhase,
    generation: u64,
    segment: Option<CancellationToken>,
}

impl TimerState {
    fn elapsed_at(&self, now: Instant) -> Duration {
        let running = match (self.phase, self.reference) {
            (TimerPhase::Running, Some(reference)) => now.saturating_duration_since(reference),
            _ => Duration::ZERO,
        };
        self.banked + running
    }

    fn remaining_at(&self, now: Instant) -> Duration {
        match self.phase {
            TimerPhase::Idle => Duration::ZERO,
            _ => self.timeout.saturating_sub(self.elapsed_at(now)),
        }
    }

    /// Invalidates the running segment, if any.
    fn cancel_segment(&mut self) {
        self.generation += 1;
        if let Some(token) = self.segment.take() {
            token.cancel();
        }
    }

    fn clear(&mut self) {
        self.cancel_segment();
        self.reference = None;
        self.banked = Duration::ZERO;
        self.phase = TimerPhase::Idle;
    }
}

struct TimerInner {
    state: Mutex<TimerState>,
    countdown: watch::Sender<u64>,
    on_timeout: Box<dyn Fn() + Send + Sync>,
}

impl TimerInner {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, remaining: Duration) {
        self.countdown.send_replace(remaining.as_secs());
    }

    fn tick(&self, generation: u64) {
        let state = self.lock();
        if state.generation != generation || state.phase != TimerPhase::Running {
            return;
        }
        let remaining = state.remaining_at(Instant::now());
        drop(state);
        self.publish(remaining);
    }

    fn expire(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation || state.phase != TimerPhase::Running {
            return;
        }
        state.clear();
        drop(state);

        self.publish(Duration::ZERO);
        info!("Inactivity timeout reached");
        (self.on_timeout)();
    }
}

/// Counts down an inactivity timeout across pause/resume cycles and invokes a
/// callback once when it runs out.
///
/// Segment tasks are spawned on the ambient Tokio runtime.
pub struct InactivityTimer {
    inner: Arc<TimerInner>,
}

impl InactivityTimer {
    pub fn new(timeout: Duration, on_timeout: impl Fn() + Send + Sync + 'static) -> Self {
        let (countdown, _) = watch::channel(0);
        Self {
            inner: Arc::new(TimerInner {
                state: Mutex::new(TimerState {
                    timeout,
                    reference: None,
                    banked: Duration::ZERO,
                    phase: TimerPhase::Idle,
                    generation: 0,
                    segment: None,
                }),
                countdown,
                on_timeout: Box::new(on_timeout),
            }),
        }
    }

    /// (Re)starts the countdown from `timeout`, discarding all accounting.
    pub fn start(&self, timeout: Duration) {
        let mut state = self.inner.lock();
        self.start_locked(&mut state, timeout);
        drop(state);

        self.inner.publish(timeout);
        debug!("Inactivity timer started ({}s)", timeout.as_secs());
    }

    /// Restarts the countdown with the configured timeout. Ignored unless running:
    /// activity while paused or idle neither resumes nor re-arms the timer. The
    /// phase check and the restart happen under one lock, so a concurrent
    /// `pause` or `stop` is never undone.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        if state.phase != TimerPhase::Running {
            return;
        }
        let timeout = state.timeout;
        self.start_locked(&mut state, timeout);
        drop(state);

        self.inner.publish(timeout);
        debug!("Inactivity timer reset ({}s)", timeout.as_secs());
    }

    /// Freezes the accounting. Idempotent.
    pub fn pause(&self) {
        let now = Instant::now();
        let mut state = self.inner.lock();
        if state.phase != TimerPhase::Running {
            return;
        }
        state.banked = state.elapsed_at(now);
        state.reference = None;
        state.cancel_segment();
        state.phase = TimerPhase::Paused;
        let remaining = state.remaining_at(now);
        drop(state);

        self.inner.publish(remaining);
        debug!("Inactivity timer paused ({}s left)", remaining.as_secs());
    }

    /// Continues from the banked elapsed time. Idempotent. If nothing is left the
    /// timeout callback runs immediately, before this call returns.
    pub fn resume(&self) {
        let now = Instant::now();
        let mut state = self.inner.lock();
        if state.phase != TimerPhase::Paused {
            return;
        }
        let remaining = state.timeout.saturating_sub(state.banked);
        if remaining.is_zero() {
            state.clear();
            drop(state);

            self.inner.publish(Duration::ZERO);
            info!("Inactivity timeout elapsed while paused");
            (self.inner.on_timeout)();
            return;
        }

        state.reference = Some(now);
        state.phase = TimerPhase::Running;
        self.schedule(&mut state, now, remaining);
        drop(state);

        self.inner.publish(remaining);
        debug!("Inactivity timer resumed ({}s left)", remaining.as_secs());
    }

    /// Cancels everything and zeroes the accounting.
    pub fn stop(&self) {
        let mut state = self.inner.lock();
        state.clear();
        drop(state);
        self.inner.publish(Duration::ZERO);
    }

    pub fn phase(&self) -> TimerPhase {
        self.inner.lock().phase
    }

    pub fn is_paused(&self) -> bool {
        self.phase() == TimerPhase::Paused
    }

    pub fn timeout(&self) -> Duration {
        self.inner.lock().timeout
    }

    /// Effective elapsed time of the current cycle; frozen while paused.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().elapsed_at(Instant::now())
    }

    /// Whole seconds until the timeout fires; 0 when idle.
    pub fn remaining_secs(&self) -> u64 {
        self.inner.lock().remaining_at(Instant::now()).as_secs()
    }

    /// The published countdown, updated once per second while running.
    pub fn countdown(&self) -> watch::Receiver<u64> {
        self.inner.countdown.subscribe()
    }

    fn start_locked(&self, state: &mut TimerState, timeout: Duration) {
        let now = Instant::now();
        state.clear();
        state.timeout = timeout;
        state.reference = Some(now);
        state.phase = TimerPhase::Running;
        self.schedule(state, now, timeout);
    }

    fn schedule(&self, state: &mut TimerState, now: Instant, remaining: Duration) {
        let token = CancellationToken::new();
        state.segment = Some(token.clone());
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);

        // A deadline past what `Instant` can represent never arrives.
        let deadline = now.checked_add(remaining).or_else(|| now.checked_add(FAR_FUTURE));
        let Some(deadline) = deadline else {
            warn!("Inactivity timeout of {}s is out of range, countdown not scheduled", remaining.as_secs());
            return;
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(run_segment(inner, generation, token, now, deadline));
            }
            Err(_) => warn!("No async runtime available, inactivity countdown not scheduled"),
        }
    }

    /// Marks `elapsed` as already spent in the current paused cycle.
    #[cfg(test)]
    pub(crate) fn bank_elapsed(&self, elapsed: Duration) {
        let mut state = self.inner.lock();
        if state.phase == TimerPhase::Paused {
            state.banked = elapsed;
        }
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.inner.lock().cancel_segment();
    }
}

async fn run_segment(
    inner: Arc<TimerInner>,
    generation: u64,
    token: CancellationToken,
    started: Instant,
    deadline: Instant,
) {
    let mut ticker = time::interval_at(started + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let expiry = time::sleep_until(deadline);
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = &mut expiry => {
                inner.expire(generation);
                return;
            }
            _ = ticker.tick() => inner.tick(generation),
        }
    }
}
