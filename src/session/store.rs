//! Session Store
//!
//! Server-side sessions keyed by a random id held in a cookie. A session
//! carries the signed-in user and the access token forwarded to the backend.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::User;

/// Unique identifier for a session
pub type SessionId = String;

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user: User,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process session table
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Open a session for a signed-in user
    pub async fn create(&self, user: User, access_token: String) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user,
            access_token,
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());

        tracing::info!(user_id = %session.user.id, "Session opened");
        session
    }

    /// Look up a live session; expired entries are dropped
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(session) if !session.is_expired(now) => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().await.remove(id);
        tracing::debug!(session_id = %id, "Session expired");
        None
    }

    /// Close a session, returning it if it existed
    pub async fn remove(&self, id: &str) -> Option<Session> {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = &removed {
            tracing::info!(user_id = %session.user.id, "Session closed");
        }
        removed
    }

    /// Drop every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn a task purging expired sessions every `interval`
    pub fn start_background_purge(
        self: Arc<Self>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let purged = self.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::new(Duration::minutes(5));
        let session = store
            .create(User::new("u1", "a@example.com"), "tok".to_string())
            .await;

        let found = store.get(&session.id).await.unwrap();
        assert_eq!(found.access_token, "tok");
        assert_eq!(store.len().await, 1);

        assert!(store.remove(&session.id).await.is_some());
        assert!(store.get(&session.id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::zero());
        let a = store.create(User::new("u1", "a@example.com"), "t1".to_string()).await;
        store.create(User::new("u2", "b@example.com"), "t2".to_string()).await;

        assert!(store.get(&a.id).await.is_none());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = SessionStore::new(Duration::minutes(5));
        assert!(store.get("nope").await.is_none());
        assert!(store.remove("nope").await.is_none());
    }
}
