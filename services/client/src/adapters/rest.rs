//! services/client/src/adapters/rest.rs
//!
//! Adapter for the managed backend: GoTrue-style auth endpoints under
//! `/auth/v1` and PostgREST-style row endpoints under `/rest/v1`, spoken over
//! `reqwest`. The session is held locally in a `SessionCell`, refreshed with
//! the refresh token once it expires.

use crate::error::{http_error, ClientError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use emotion_diary_core::ports::{
    AuthProvider, EntryStore, PortError, PortResult, ProfileStore, SessionSubscription,
};
use emotion_diary_core::{
    Answers, AuthEvent, AuthSession, DiaryEntry, Emotion, EntryOrder, EntryPatch, EntryQuery,
    NewEntry, ProfileUpdate, SessionCell, User, UserProfile,
};
use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Client, Method, RequestBuilder, StatusCode, Url,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const RETURN_REPRESENTATION: &str = "return=representation";

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize, Default)]
struct UserMetadata {
    full_name: Option<String>,
}

#[derive(Deserialize)]
struct GoTrueUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}
impl GoTrueUser {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            display_name: self.user_metadata.full_name,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: GoTrueUser,
}
impl TokenResponse {
    fn to_domain(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| {
                now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS))
            });
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user: self.user.to_domain(),
            expires_at,
        }
    }
}

/// Sign-up answers with a session when confirmation is off, a bare user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(GoTrueUser),
}

#[derive(Serialize)]
struct EntryInsert<'a> {
    date: chrono::NaiveDate,
    emotion: Emotion,
    answers: &'a Answers,
    one_line_message: Option<&'a str>,
    user_id: Uuid,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct RestBackend {
    client: Client,
    base: Url,
    key: String,
    reset_redirect: Option<String>,
    session: SessionCell,
}

impl RestBackend {
    pub fn new(base: Url, key: String, reset_redirect: Option<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base,
            key,
            reset_redirect,
            session: SessionCell::new(),
        })
    }

    fn endpoint(&self, path: &str) -> PortResult<Url> {
        self.base
            .join(path)
            .map_err(|e| PortError::Configuration(format!("Bad backend URL for {}: {}", path, e)))
    }

    /// A request carrying the public key and, when given, the user's token.
    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let bearer = format!("Bearer {}", token.unwrap_or(&self.key));
        let mut builder = self.client.request(method, url).header("apikey", &self.key);
        if let Ok(value) = HeaderValue::from_str(&bearer) {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder
    }

    /// Row requests run as the signed-in user so row-level security applies.
    fn row_request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self.session.get().map(|session| session.access_token);
        self.request(method, url, token.as_deref())
    }

    async fn refresh(&self, refresh_token: &str) -> PortResult<AuthSession> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");
        let response: TokenResponse = send_json(
            self.request(Method::POST, url, None)
                .json(&json!({ "refresh_token": refresh_token })),
            ErrorContext::Auth,
        )
        .await?;
        Ok(response.to_domain(Utc::now()))
    }

    async fn fetch_user(&self, token: &str) -> PortResult<User> {
        let url = self.endpoint("auth/v1/user")?;
        let user: GoTrueUser =
            send_json(self.request(Method::GET, url, Some(token)), ErrorContext::Auth).await?;
        Ok(user.to_domain())
    }

    fn rows_url(&self, table: &str, filters: &[(String, String)]) -> PortResult<Url> {
        let mut url = self.endpoint(&format!("rest/v1/{}", table))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

//=========================================================================================
// Response Handling
//=========================================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ErrorContext {
    /// Client errors mean the backend refused the credentials or input.
    Auth,
    Rows,
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder, context: ErrorContext) -> PortResult<T> {
    let response = request.send().await.map_err(http_error)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        return Err(status_error(status, message, context));
    }
    response.json::<T>().await.map_err(http_error)
}

/// Pulls the human-readable message out of a GoTrue or PostgREST error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn status_error(status: StatusCode, message: String, context: ErrorContext) -> PortError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if context == ErrorContext::Rows => {
            PortError::Unauthorized
        }
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        StatusCode::REQUEST_TIMEOUT
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => PortError::Network(message),
        s if s.is_client_error() && context == ErrorContext::Auth => PortError::Rejected(message),
        _ => PortError::Unexpected(message),
    }
}

/// PostgREST query parameters for an entry query.
fn entry_filters(query: &EntryQuery) -> Vec<(String, String)> {
    let mut filters = vec![
        ("select".to_string(), "*".to_string()),
        ("user_id".to_string(), format!("eq.{}", query.user_id)),
    ];
    if let Some(date) = query.date {
        filters.push(("date".to_string(), format!("eq.{}", date.format("%Y-%m-%d"))));
    }
    if let Some(from) = query.from {
        filters.push(("date".to_string(), format!("gte.{}", from.format("%Y-%m-%d"))));
    }
    if let Some(to) = query.to {
        filters.push(("date".to_string(), format!("lte.{}", to.format("%Y-%m-%d"))));
    }
    let order = match query.order {
        EntryOrder::DateAsc => "date.asc,created_at.asc",
        EntryOrder::CreatedDesc => "created_at.desc",
        EntryOrder::DateAscCreatedDesc => "date.asc,created_at.desc",
    };
    filters.push(("order".to_string(), order.to_string()));
    filters
}

fn owned_row(id: Uuid, user_id: Uuid) -> Vec<(String, String)> {
    vec![
        ("id".to_string(), format!("eq.{}", id)),
        ("user_id".to_string(), format!("eq.{}", user_id)),
    ]
}

fn patch_body(patch: &EntryPatch) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(emotion) = patch.emotion {
        body.insert("emotion".into(), json!(emotion));
    }
    if let Some(answers) = &patch.answers {
        body.insert("answers".into(), json!(answers));
    }
    if let Some(message) = &patch.one_line_message {
        body.insert("one_line_message".into(), json!(message));
    }
    body.insert("updated_at".into(), json!(Utc::now()));
    Value::Object(body)
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl AuthProvider for RestBackend {
    async fn current_session(&self) -> PortResult<Option<AuthSession>> {
        let Some(session) = self.session.get() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            info!("Session for {} expired without a refresh token", session.user.id);
            self.session.clear();
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(refreshed) => {
                debug!("Refreshed session for {}", refreshed.user.id);
                self.session
                    .set(Some(refreshed.clone()), AuthEvent::TokenRefreshed);
                Ok(Some(refreshed))
            }
            Err(PortError::Network(message)) => Err(PortError::Network(message)),
            Err(e) => {
                warn!("Session refresh rejected: {}", e);
                self.session.clear();
                Ok(None)
            }
        }
    }

    async fn current_user(&self) -> PortResult<Option<User>> {
        let Some(session) = self.current_session().await? else {
            return Ok(None);
        };
        match self.fetch_user(&session.access_token).await {
            Ok(user) => Ok(Some(user)),
            Err(PortError::Rejected(message)) => {
                warn!("Backend no longer accepts the session: {}", message);
                self.session.clear();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.session.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response: TokenResponse = send_json(
            self.request(Method::POST, url, None)
                .json(&json!({ "email": email, "password": password })),
            ErrorContext::Auth,
        )
        .await?;

        let session = response.to_domain(Utc::now());
        self.session.set(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> PortResult<User> {
        let url = self.endpoint("auth/v1/signup")?;
        let response: SignUpResponse = send_json(
            self.request(Method::POST, url, None).json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": display_name },
            })),
            ErrorContext::Auth,
        )
        .await?;

        match response {
            SignUpResponse::Session(token) => {
                let session = token.to_domain(Utc::now());
                let user = session.user.clone();
                self.session.set(Some(session), AuthEvent::SignedIn);
                Ok(user)
            }
            SignUpResponse::User(user) => Ok(user.to_domain()),
        }
    }

    async fn sign_out(&self) -> PortResult<()> {
        let Some(session) = self.session.get() else {
            return Ok(());
        };
        let result = match self.endpoint("auth/v1/logout") {
            Ok(url) => self
                .request(Method::POST, url, Some(&session.access_token))
                .send()
                .await
                .map_err(http_error)
                .and_then(|response| {
                    let status = response.status();
                    if status.is_success() || status == StatusCode::UNAUTHORIZED {
                        Ok(())
                    } else {
                        Err(status_error(status, status.to_string(), ErrorContext::Auth))
                    }
                }),
            Err(e) => Err(e),
        };
        self.session.clear();
        result
    }

    async fn request_password_reset(&self, email: &str) -> PortResult<()> {
        let mut url = self.endpoint("auth/v1/recover")?;
        if let Some(redirect) = &self.reset_redirect {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }
        let _: Value = send_json(
            self.request(Method::POST, url, None)
                .json(&json!({ "email": email })),
            ErrorContext::Auth,
        )
        .await?;
        Ok(())
    }

    async fn update_password(&self, password: &str) -> PortResult<User> {
        let session = self
            .current_session()
            .await?
            .ok_or(PortError::Unauthorized)?;
        let url = self.endpoint("auth/v1/user")?;
        let user: GoTrueUser = send_json(
            self.request(Method::PUT, url, Some(&session.access_token))
                .json(&json!({ "password": password })),
            ErrorContext::Auth,
        )
        .await?;

        let user = user.to_domain();
        self.session.set(
            Some(AuthSession {
                user: user.clone(),
                ..session
            }),
            AuthEvent::UserUpdated,
        );
        Ok(user)
    }
}

#[async_trait]
impl EntryStore for RestBackend {
    async fn insert_entry(&self, user_id: Uuid, entry: &NewEntry) -> PortResult<DiaryEntry> {
        let url = self.rows_url("diary_entries", &[])?;
        let body = EntryInsert {
            date: entry.date,
            emotion: entry.emotion,
            answers: &entry.answers,
            one_line_message: entry.one_line_message.as_deref(),
            user_id,
        };
        let rows: Vec<DiaryEntry> = send_json(
            self.row_request(Method::POST, url)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(&body),
            ErrorContext::Rows,
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PortError::Unexpected("Insert returned no row".to_string()))
    }

    async fn select_entries(&self, query: &EntryQuery) -> PortResult<Vec<DiaryEntry>> {
        let url = self.rows_url("diary_entries", &entry_filters(query))?;
        send_json(self.row_request(Method::GET, url), ErrorContext::Rows).await
    }

    async fn update_entry(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &EntryPatch,
    ) -> PortResult<DiaryEntry> {
        let url = self.rows_url("diary_entries", &owned_row(id, user_id))?;
        let rows: Vec<DiaryEntry> = send_json(
            self.row_request(Method::PATCH, url)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(&patch_body(patch)),
            ErrorContext::Rows,
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PortError::NotFound(format!("Entry {} not found", id)))
    }

    async fn delete_entry(&self, id: Uuid, user_id: Uuid) -> PortResult<u64> {
        let url = self.rows_url("diary_entries", &owned_row(id, user_id))?;
        let rows: Vec<Value> = send_json(
            self.row_request(Method::DELETE, url)
                .header("Prefer", RETURN_REPRESENTATION),
            ErrorContext::Rows,
        )
        .await?;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl ProfileStore for RestBackend {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>> {
        let filters = [
            ("select".to_string(), "*".to_string()),
            ("id".to_string(), format!("eq.{}", user_id)),
        ];
        let url = self.rows_url("users", &filters)?;
        let rows: Vec<UserProfile> =
            send_json(self.row_request(Method::GET, url), ErrorContext::Rows).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> PortResult<UserProfile> {
        let url = self.rows_url("users", &[("id".to_string(), format!("eq.{}", user_id))])?;
        let mut body = serde_json::to_value(update)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("updated_at".into(), json!(Utc::now()));
        }
        let rows: Vec<UserProfile> = send_json(
            self.row_request(Method::PATCH, url)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(&body),
            ErrorContext::Rows,
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }
}
