//! In-memory login sessions for the dashboard's password gate
//!
//! This is a demo convenience, not a security boundary: one static
//! password and opaque random tokens. Sessions expire after a fixed
//! lifetime and the oldest are evicted once the store is full.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::DomainError;

pub const DEFAULT_USERNAME: &str = "user";
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

pub fn default_session_ttl() -> Duration {
    Duration::hours(8)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionStore {
    password: String,
    ttl: Duration,
    max_sessions: usize,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            ttl: default_session_ttl(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, ttl: Duration, max_sessions: usize) -> Self {
        self.ttl = ttl;
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.created_at >= self.ttl
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the password and open a session
    pub fn login(&self, username: Option<&str>, password: &str) -> Result<Session, DomainError> {
        if password != self.password {
            return Err(DomainError::unauthorized("incorrect password"));
        }

        let username = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_USERNAME);

        let session = Session {
            token: Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        };

        let mut sessions = self.sessions.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, session.created_at));
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|s| s.created_at)
                .map(|s| s.token.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
        }
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "Evicted sessions");
        }

        sessions.insert(session.token.clone(), session.clone());

        info!(username = %session.username, "Session opened");
        Ok(session)
    }

    pub fn validate(&self, token: &str) -> Result<Session, DomainError> {
        let sessions = self.sessions.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        sessions
            .get(token)
            .filter(|s| !self.is_expired(s, Utc::now()))
            .cloned()
            .ok_or_else(|| DomainError::unauthorized("session is unknown or has ended"))
    }

    /// End a session; returns whether it existed
    pub fn logout(&self, token: &str) -> Result<bool, DomainError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        let removed = sessions.remove(token).is_some();
        debug!(removed, "Session closed");
        Ok(removed)
    }
}
