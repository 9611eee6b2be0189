//! crates/emotion_diary_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! The serde derives describe the backend's storage shape: `date` is a plain
//! `YYYY-MM-DD` calendar string, timestamps are RFC 3339.

use crate::emotion::Emotion;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Guided-question answers of an entry, keyed by question key.
pub type Answers = BTreeMap<String, String>;

// Represents a signed-in user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

// Represents the backend's login session for this browser context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// What happened to the backend session when a change was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A push notification from the backend's session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

/// Row of the `users` profile table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// One journaled record for a user on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub emotion: Emotion,
    pub answers: Answers,
    pub one_line_message: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The write-flow payload for a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub emotion: Emotion,
    pub answers: Answers,
    pub one_line_message: Option<String>,
}

/// A partial update. `None` leaves the stored field untouched; for the
/// message, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub emotion: Option<Emotion>,
    pub answers: Option<Answers>,
    pub one_line_message: Option<Option<String>>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.emotion.is_none() && self.answers.is_none() && self.one_line_message.is_none()
    }
}

/// Row ordering for entry queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryOrder {
    /// Chronological by calendar day.
    #[default]
    DateAsc,
    /// Most recently created first.
    CreatedDesc,
    /// Chronological by day, most recently created first within a day.
    DateAscCreatedDesc,
}

/// A filter against the `diary_entries` table, always scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub user_id: Uuid,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub order: EntryOrder,
}

impl EntryQuery {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            date: None,
            from: None,
            to: None,
            order: EntryOrder::default(),
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn since(mut self, from: Option<NaiveDate>) -> Self {
        self.from = from;
        self
    }

    pub fn until(mut self, to: Option<NaiveDate>) -> Self {
        self.to = to;
        self
    }

    pub fn ordered(mut self, order: EntryOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether `entry` passes every filter of this query.
    pub fn matches(&self, entry: &DiaryEntry) -> bool {
        entry.user_id == self.user_id
            && self.date.map_or(true, |d| entry.date == d)
            && self.from.map_or(true, |d| entry.date >= d)
            && self.to.map_or(true, |d| entry.date <= d)
    }
}

/// The lightweight per-entry view used to paint a calendar cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarMark {
    pub emotion: Emotion,
    pub one_line_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Calendar day -> marks, most recently created first.
pub type CalendarSummary = BTreeMap<NaiveDate, Vec<CalendarMark>>;

/// One `{date, emotion}` pair for frequency aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsPoint {
    pub date: NaiveDate,
    pub emotion: Emotion,
}
