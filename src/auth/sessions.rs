//! In-memory session store keyed by the SHA-256 of the session token.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::utils::hash_session_token;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Public handle for the session, safe to use as an ownership key.
    pub id: Uuid,
    /// Client identifier the login came from.
    pub identifier: String,
    pub created_at: Duration,
}

impl Session {
    fn expired(&self, now: Duration, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| now.saturating_sub(self.created_at) >= ttl)
    }
}

#[derive(Debug)]
pub struct SessionStore {
    ttl: Option<Duration>,
    sessions: Mutex<HashMap<[u8; 32], Session>>,
}

impl SessionStore {
    /// `ttl` of `None` keeps sessions until logout or restart.
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, token: &str, session: Session) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(hash_session_token(token), session);
    }

    /// Returns the session for `token` if it exists and has not outlived the TTL.
    /// An expired session is dropped on the way out.
    pub async fn lookup(&self, token: &str, now: Duration) -> Option<Session> {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        let expired = sessions.get(&key)?.expired(now, self.ttl);
        if expired {
            sessions.remove(&key);
            return None;
        }
        sessions.get(&key).cloned()
    }

    /// Removes the session; unknown tokens are ignored.
    pub async fn remove(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&hash_session_token(token))
    }

    /// Drops every expired session and returns how many were removed.
    pub async fn sweep(&self, now: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.expired(now, self.ttl));
        before - sessions.len()
    }

    /// Counts sessions that `lookup` would still accept at `now`.
    pub async fn active(&self, now: Duration) -> usize {
        let sessions = self.sessions.lock().await;
        sessions
            .values()
            .filter(|session| !session.expired(now, self.ttl))
            .count()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
