//! In-memory backend used by the unit tests of the session and diary layers.

use crate::domain::{
    AuthEvent, AuthSession, DiaryEntry, EntryOrder, EntryPatch, EntryQuery, NewEntry,
    ProfileUpdate, User, UserProfile,
};
use crate::ports::{
    AuthProvider, EntryStore, PortError, PortResult, ProfileStore, SessionSubscription,
};
use crate::session_cell::SessionCell;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

struct Account {
    user: User,
    password: String,
}

pub(crate) struct MemoryBackend {
    session: SessionCell,
    accounts: Mutex<Vec<Account>>,
    entries: Mutex<Vec<DiaryEntry>>,
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
    clock: Mutex<DateTime<Utc>>,
    pub fail_sign_out: AtomicBool,
    pub fail_session_lookup: AtomicBool,
    pub sign_out_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            session: SessionCell::new(),
            accounts: Mutex::new(Vec::new()),
            entries: Mutex::new(Vec::new()),
            profiles: Mutex::new(HashMap::new()),
            clock: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
            fail_sign_out: AtomicBool::new(false),
            fail_session_lookup: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Creates an account without signing in.
    pub fn register(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            display_name: None,
        };
        self.accounts.lock().unwrap().push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        let now = self.tick();
        self.profiles.lock().unwrap().insert(
            user.id,
            UserProfile {
                id: user.id,
                full_name: None,
                email: user.email.clone(),
                avatar_url: None,
                created_at: now,
                updated_at: now,
            },
        );
        user
    }

    /// Installs a session for `user`, as if restored from storage at page load.
    pub fn restore_session(&self, user: &User) {
        self.session.set(Some(self.session_for(user)), AuthEvent::SignedIn);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn session_for(&self, user: &User) -> AuthSession {
        AuthSession {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: None,
            user: user.clone(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    /// Advances the fake clock by one second and returns it.
    fn tick(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::seconds(1);
        *clock
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn current_session(&self) -> PortResult<Option<AuthSession>> {
        if self.fail_session_lookup.load(Ordering::SeqCst) {
            return Err(PortError::Network("Failed to fetch".into()));
        }
        Ok(self.session.get())
    }

    async fn current_user(&self) -> PortResult<Option<User>> {
        Ok(self.session.get().map(|session| session.user))
    }

    fn subscribe(&self) -> SessionSubscription {
        self.session.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let user = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|account| account.user.email.as_deref() == Some(email) && account.password == password)
            .map(|account| account.user.clone())
            .ok_or_else(|| PortError::Rejected("Invalid login credentials".into()))?;
        let session = self.session_for(&user);
        self.session.set(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> PortResult<User> {
        let exists = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .any(|account| account.user.email.as_deref() == Some(email));
        if exists {
            return Err(PortError::Rejected("User already registered".into()));
        }
        let mut user = self.register(email, password);
        user.display_name = display_name.map(str::to_string);
        Ok(user)
    }

    async fn sign_out(&self) -> PortResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(PortError::Network("Failed to fetch".into()));
        }
        self.session.clear();
        Ok(())
    }

    async fn request_password_reset(&self, _email: &str) -> PortResult<()> {
        Ok(())
    }

    async fn update_password(&self, password: &str) -> PortResult<User> {
        let session = self.session.get().ok_or(PortError::Unauthorized)?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|account| account.user.id == session.user.id)
            .ok_or_else(|| PortError::NotFound("user".into()))?;
        account.password = password.to_string();
        Ok(account.user.clone())
    }
}

#[async_trait]
impl EntryStore for MemoryBackend {
    async fn insert_entry(&self, user_id: Uuid, entry: &NewEntry) -> PortResult<DiaryEntry> {
        let now = self.tick();
        let stored = DiaryEntry {
            id: Uuid::new_v4(),
            date: entry.date,
            emotion: entry.emotion,
            answers: entry.answers.clone(),
            one_line_message: entry.one_line_message.clone(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.entries.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn select_entries(&self, query: &EntryQuery) -> PortResult<Vec<DiaryEntry>> {
        let mut rows: Vec<DiaryEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        match query.order {
            EntryOrder::DateAsc => rows.sort_by_key(|entry| entry.date),
            EntryOrder::CreatedDesc => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            EntryOrder::DateAscCreatedDesc => {
                rows.sort_by(|a, b| a.date.cmp(&b.date).then(b.created_at.cmp(&a.created_at)))
            }
        }
        Ok(rows)
    }

    async fn update_entry(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &EntryPatch,
    ) -> PortResult<DiaryEntry> {
        let now = self.tick();
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == id && entry.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Entry {} not found", id)))?;
        if let Some(emotion) = patch.emotion {
            entry.emotion = emotion;
        }
        if let Some(answers) = &patch.answers {
            entry.answers = answers.clone();
        }
        if let Some(message) = &patch.one_line_message {
            entry.one_line_message = message.clone();
        }
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn delete_entry(&self, id: Uuid, user_id: Uuid) -> PortResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|entry| !(entry.id == id && entry.user_id == user_id));
        Ok((before - entries.len()) as u64)
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> PortResult<UserProfile> {
        let now = self.tick();
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        if let Some(full_name) = &update.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(avatar_url) = &update.avatar_url {
            profile.avatar_url = Some(avatar_url.clone());
        }
        profile.updated_at = now;
        Ok(profile.clone())
    }
}
