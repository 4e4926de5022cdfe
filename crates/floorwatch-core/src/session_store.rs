use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::types::Session;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Durable record store for occupancy sessions. The ledger is the sole
/// writer; adapters only move records, they never decide session state.
///
/// `insert`/`update` must be all-or-nothing: a failed call leaves the
/// store's view of the session (including the open-session lookup)
/// unchanged.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a newly opened session.
    async fn insert(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Persist the closed form of an existing session.
    async fn update(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// The open session for a zone, if any.
    async fn find_open(&self, zone_id: i64) -> Result<Option<Session>, SessionStoreError>;

    /// Every stored session, in no particular order; callers sort.
    async fn list(&self) -> Result<Vec<Session>, SessionStoreError>;
}

/// In-memory adapter for tests and Redis-less deployments.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<Vec<Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.sessions.lock().await.push(session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<(), SessionStoreError> {
        let mut guard = self.sessions.lock().await;
        match guard.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(SessionStoreError::Unavailable(format!(
                "unknown session id {}",
                session.id
            ))),
        }
    }

    async fn find_open(&self, zone_id: i64) -> Result<Option<Session>, SessionStoreError> {
        let guard = self.sessions.lock().await;
        Ok(guard
            .iter()
            .find(|s| s.zone_id == zone_id && s.is_open())
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Session>, SessionStoreError> {
        Ok(self.sessions.lock().await.clone())
    }
}
