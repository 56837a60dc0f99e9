//! In-memory session store and the authenticated-user extractor
//!
//! Sessions live for the lifetime of the process. Without a configured TTL
//! entries are never evicted, so the map only grows.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::{ready, Ready};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;

pub const SESSION_COOKIE_NAME: &str = "waffle_session";

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    created_at: DateTime<Utc>,
}

/// Process-wide session store
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Issue a new token for `username`
    pub fn create(&self, username: &str) -> String {
        let bytes: [u8; TOKEN_BYTES] = rand::random();
        let token = hex::encode(bytes);
        self.sessions.insert(
            token.clone(),
            SessionEntry {
                username: username.to_string(),
                created_at: Utc::now(),
            },
        );
        tracing::info!(username = %username, "session created");
        token
    }

    /// Username bound to `token`, if the session exists and has not expired
    pub fn get(&self, token: &str) -> Option<String> {
        let entry = self.sessions.get(token)?;
        if let Some(ttl) = self.ttl {
            let age = Utc::now().signed_duration_since(entry.created_at);
            if age.to_std().map(|age| age > ttl).unwrap_or(false) {
                return None;
            }
        }
        Some(entry.username.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Session cookie carrying `token`
pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Identity resolved from the session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
}

impl AuthenticatedUser {
    fn resolve(req: &HttpRequest) -> Result<Self, AppError> {
        let store = req
            .app_data::<web::Data<Arc<SessionStore>>>()
            .ok_or_else(|| AppError::Internal("session store not configured".into()))?;

        let token = req
            .cookie(SESSION_COOKIE_NAME)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing session".into()))?;

        let username = store
            .get(&token)
            .ok_or_else(|| AppError::Unauthorized("invalid or expired session".into()))?;

        Ok(Self { username })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::resolve(req))
    }
}
