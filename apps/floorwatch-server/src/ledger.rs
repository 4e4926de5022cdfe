use std::sync::Arc;

use dashmap::DashMap;
use floorwatch_core::session_store::{SessionStore, SessionStoreError};
use floorwatch_core::types::{now_millis, Session};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("zone {0} already has an open session")]
    SessionAlreadyOpen(i64),
    #[error("zone {0} has no open session")]
    NoOpenSession(i64),
    #[error(transparent)]
    Storage(#[from] SessionStoreError),
}

/// Sole writer of session records. Open sessions are a derived view of the
/// store (absent end time), never a second structure. The open-check and
/// the write behind it form one critical section per zone; different zones
/// and all reads proceed independently.
#[derive(Clone)]
pub struct SessionLedger {
    store: Arc<dyn SessionStore>,
    zone_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl SessionLedger {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            zone_locks: Arc::new(DashMap::new()),
        }
    }

    fn zone_lock(&self, zone_id: i64) -> Arc<Mutex<()>> {
        self.zone_locks
            .entry(zone_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Open a session for the zone. Fails with `SessionAlreadyOpen` when one
    /// is already open; callers treat that as a no-op, not a fault.
    pub async fn open_session(&self, zone_id: i64) -> Result<Session, LedgerError> {
        let lock = self.zone_lock(zone_id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.find_open(zone_id).await? {
            debug!(zone_id, session_id = %existing.id, "zone already has an open session");
            return Err(LedgerError::SessionAlreadyOpen(zone_id));
        }
        let session = Session::open(zone_id, now_millis());
        self.store.insert(&session).await?;
        info!(zone_id, session_id = %session.id, "session opened");
        Ok(session)
    }

    /// Close the zone's open session, stamping the end time and the rounded
    /// duration in minutes.
    pub async fn close_session(&self, zone_id: i64) -> Result<Session, LedgerError> {
        let lock = self.zone_lock(zone_id);
        let _guard = lock.lock().await;

        let Some(mut session) = self.store.find_open(zone_id).await? else {
            return Err(LedgerError::NoOpenSession(zone_id));
        };
        session.close(now_millis());
        self.store.update(&session).await?;
        info!(
            zone_id,
            session_id = %session.id,
            minutes = ?session.duration_minutes,
            "session closed"
        );
        Ok(session)
    }

    /// Every session, newest start first. Takes no zone lock.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, LedgerError> {
        let mut sessions = self.store.list().await?;
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }
}
