//! crates/emotion_diary_core/src/diary.rs
//!
//! The diary access layer. Every operation resolves the signed-in user through
//! the auth provider first and scopes its query to that user; failures come
//! back as a `DiaryError` with a message safe to show.

use crate::domain::{
    CalendarMark, CalendarSummary, DiaryEntry, EntryOrder, EntryPatch, EntryQuery, NewEntry,
    StatsPoint,
};
use crate::error::DiaryError;
use crate::ports::{AuthProvider, EntryStore};
use crate::stats::{EmotionStats, StatsPeriod};
use chrono::{Months, NaiveDate};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct DiaryService {
    auth: Arc<dyn AuthProvider>,
    entries: Arc<dyn EntryStore>,
}

impl DiaryService {
    pub fn new(auth: Arc<dyn AuthProvider>, entries: Arc<dyn EntryStore>) -> Self {
        Self { auth, entries }
    }

    /// Saves a new entry. Every question of the chosen emotion needs a
    /// non-blank answer; a blank message is stored as null. The caller keeps
    /// `entry`, so a form can be resubmitted after a failure.
    pub async fn create(&self, entry: &NewEntry) -> Result<DiaryEntry, DiaryError> {
        let user_id = self.require_user().await?;

        let missing = entry.emotion.missing_answers(&entry.answers);
        if !missing.is_empty() {
            return Err(DiaryError::IncompleteAnswers(
                missing.into_iter().map(String::from).collect(),
            ));
        }

        let entry = NewEntry {
            one_line_message: entry
                .one_line_message
                .clone()
                .filter(|message| !message.trim().is_empty()),
            ..entry.clone()
        };

        let saved = self
            .entries
            .insert_entry(user_id, &entry)
            .await
            .map_err(|e| {
                error!("Failed to save diary entry: {}", e);
                DiaryError::persistence("save diary entry", e)
            })?;
        info!("Saved diary entry {} for {}", saved.id, saved.date);
        Ok(saved)
    }

    /// All entries of one day, most recently created first.
    pub async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<DiaryEntry>, DiaryError> {
        let user_id = self.require_user().await?;
        let query = EntryQuery::for_user(user_id)
            .on(date)
            .ordered(EntryOrder::CreatedDesc);
        self.select("load diary entries", &query).await
    }

    /// The most recent entry of a day, if any.
    pub async fn latest_for_date(&self, date: NaiveDate) -> Result<Option<DiaryEntry>, DiaryError> {
        Ok(self.list_by_date(date).await?.into_iter().next())
    }

    /// Entries between the first and last day of the month, chronological.
    pub async fn list_by_month(&self, year: i32, month: u32) -> Result<Vec<DiaryEntry>, DiaryError> {
        let (first, last) = month_bounds(year, month)?;
        let user_id = self.require_user().await?;
        let query = EntryQuery::for_user(user_id)
            .since(Some(first))
            .until(Some(last));
        self.select("load monthly entries", &query).await
    }

    /// The month's entries grouped by day for calendar cells, newest first
    /// within each day. Answer bodies are left out.
    pub async fn calendar_summary(&self, year: i32, month: u32) -> Result<CalendarSummary, DiaryError> {
        let (first, last) = month_bounds(year, month)?;
        let user_id = self.require_user().await?;
        let query = EntryQuery::for_user(user_id)
            .since(Some(first))
            .until(Some(last))
            .ordered(EntryOrder::DateAscCreatedDesc);
        let rows = self.select("load calendar data", &query).await?;

        let mut summary = CalendarSummary::new();
        for entry in rows {
            summary.entry(entry.date).or_default().push(CalendarMark {
                emotion: entry.emotion,
                one_line_message: entry.one_line_message,
                created_at: entry.created_at,
            });
        }
        Ok(summary)
    }

    /// `{date, emotion}` pairs in the (optionally bounded) range, chronological.
    pub async fn stats_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<StatsPoint>, DiaryError> {
        let user_id = self.require_user().await?;
        let query = EntryQuery::for_user(user_id).since(start).until(end);
        let rows = self.select("load statistics", &query).await?;
        Ok(rows
            .into_iter()
            .map(|entry| StatsPoint {
                date: entry.date,
                emotion: entry.emotion,
            })
            .collect())
    }

    /// Aggregated emotion frequencies for the week or month ending `today`.
    pub async fn period_stats(
        &self,
        period: StatsPeriod,
        today: NaiveDate,
    ) -> Result<EmotionStats, DiaryError> {
        let points = self
            .stats_range(Some(period.start(today)), Some(today))
            .await?;
        Ok(EmotionStats::from_points(&points))
    }

    /// Applies only the fields present in `patch` to one of the caller's entries.
    pub async fn update(&self, id: Uuid, patch: EntryPatch) -> Result<DiaryEntry, DiaryError> {
        let user_id = self.require_user().await?;
        if patch.is_empty() {
            return Err(DiaryError::Persistence {
                action: "update diary entry",
                message: "No fields to update".into(),
            });
        }

        let updated = self
            .entries
            .update_entry(id, user_id, &patch)
            .await
            .map_err(|e| {
                error!("Failed to update diary entry {}: {}", id, e);
                DiaryError::persistence("update diary entry", e)
            })?;
        info!("Updated diary entry {}", id);
        Ok(updated)
    }

    /// Deletes one of the caller's entries. Someone else's entry is left alone
    /// and reported as zero rows affected.
    pub async fn delete(&self, id: Uuid) -> Result<u64, DiaryError> {
        let user_id = self.require_user().await?;
        let affected = self
            .entries
            .delete_entry(id, user_id)
            .await
            .map_err(|e| {
                error!("Failed to delete diary entry {}: {}", id, e);
                DiaryError::persistence("delete diary entry", e)
            })?;
        if affected == 0 {
            debug!("Delete of {} matched no entry owned by {}", id, user_id);
        } else {
            info!("Deleted diary entry {}", id);
        }
        Ok(affected)
    }

    async fn require_user(&self) -> Result<Uuid, DiaryError> {
        match self.auth.current_user().await {
            Ok(Some(user)) => Ok(user.id),
            Ok(None) => Err(DiaryError::NotAuthenticated),
            Err(e) => {
                debug!("Could not resolve the current user: {}", e);
                Err(DiaryError::NotAuthenticated)
            }
        }
    }

    async fn select(
        &self,
        action: &'static str,
        query: &EntryQuery,
    ) -> Result<Vec<DiaryEntry>, DiaryError> {
        self.entries.select_entries(query).await.map_err(|e| {
            error!("Failed to {}: {}", action, e);
            DiaryError::persistence(action, e)
        })
    }
}

/// First and last calendar day of `month` (1-12) in `year`.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), DiaryError> {
    let invalid = || DiaryError::InvalidInput(format!("{}-{:02} is not a valid month", year, month));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((first, last))
}
