use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, convert::Infallible, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    models::Role,
};

/// Session
///
/// The explicit navigation context. Holds the single active role, serialized under the
/// `userRole` key. Notices never live here; they travel in the flash cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(rename = "userRole")]
    role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: None,
            created_at: Utc::now(),
        }
    }

    /// Starts a session that already carries a role.
    pub fn with_role(role: Role) -> Self {
        let mut session = Self::new();
        session.role = Some(role);
        session
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Replaces the active role, returning the previous one.
    pub fn set_role(&mut self, role: Role) -> Option<Role> {
        self.role.replace(role)
    }

    pub fn clear_role(&mut self) -> Option<Role> {
        self.role.take()
    }
}

// 1. SessionStore Contract
/// SessionStore
///
/// Abstract persistence for sessions, shared across requests as `Arc<dyn SessionStore>`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Option<Session>;
    /// Inserts or replaces the session under its id.
    async fn save(&self, session: Session);
    /// Returns true if a session was removed.
    async fn remove(&self, id: Uuid) -> bool;
    async fn count(&self) -> usize;
}

/// SessionState
///
/// The concrete type used to share session access across the application state.
pub type SessionState = Arc<dyn SessionStore>;

// 2. In-process implementation
/// MemorySessionStore
///
/// Keeps sessions in a process-local map. Sessions do not survive a restart; a browser
/// holding a stale cookie simply starts a new anonymous session.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    async fn save(&self, session: Session) {
        tracing::debug!(session_id = %session.id, role = ?session.role, "session saved");
        self.sessions.write().await.insert(session.id, session);
    }

    async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// 3. Request extractor
/// SessionHandle
///
/// Resolves the caller's session from the session cookie. Unknown or missing cookies start
/// a fresh anonymous session, so this extractor never rejects. Fresh sessions are not stored
/// until a handler saves them.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session: Session,
    is_new: bool,
    cookie_name: String,
}

impl SessionHandle {
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// `Set-Cookie` value binding the browser to this session.
    pub fn cookie_value(&self) -> Option<HeaderValue> {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name, self.session.id
        );
        HeaderValue::from_str(&cookie).ok()
    }

    /// Attaches the session cookie to `response` when the session was started by this request.
    pub fn attach_cookie(&self, response: &mut Response) {
        if !self.is_new {
            return;
        }
        if let Some(value) = self.cookie_value() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
}

/// Finds the value of cookie `name` in the request's Cookie headers.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = SessionState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if let Some(id) = find_cookie(&parts.headers, &config.session_cookie)
            .and_then(|value| Uuid::parse_str(value).ok())
        {
            if let Some(session) = store.load(id).await {
                return Ok(SessionHandle {
                    session,
                    is_new: false,
                    cookie_name: config.session_cookie,
                });
            }
            tracing::debug!(session_id = %id, "unknown session cookie, starting a new session");
        }

        Ok(SessionHandle {
            session: Session::new(),
            is_new: true,
            cookie_name: config.session_cookie,
        })
    }
}
