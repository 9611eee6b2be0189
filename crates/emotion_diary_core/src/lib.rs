pub mod accounts;
pub mod diary;
pub mod domain;
pub mod emotion;
pub mod error;
pub mod monitor;
pub mod network;
pub mod page;
pub mod ports;
pub mod session;
pub mod session_cell;
pub mod stats;
pub mod timer;

#[cfg(test)]
mod testing;

pub use accounts::AccountService;
pub use diary::DiaryService;
pub use domain::{
    Answers, AuthEvent, AuthSession, CalendarMark, CalendarSummary, DiaryEntry, EntryOrder,
    EntryPatch, EntryQuery, NewEntry, ProfileUpdate, SessionChange, StatsPoint, User, UserProfile,
};
pub use emotion::{Emotion, Question};
pub use error::DiaryError;
pub use monitor::{ActivityMonitor, MonitorEvent};
pub use network::{NetworkNotice, NetworkTracker};
pub use page::{PageEvent, PageEventKind, PageEvents};
pub use ports::{
    AuthProvider, Backend, EntryStore, EventTarget, PortError, PortResult, ProfileStore,
    SessionSubscription,
};
pub use session::{SessionSnapshot, SessionStatus, SessionStore};
pub use session_cell::SessionCell;
pub use stats::{EmotionCount, EmotionStats, Insight, StatsPeriod};
pub use timer::{InactivityTimer, TimerPhase, DEFAULT_INACTIVITY_TIMEOUT};
