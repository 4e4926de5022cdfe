use std::sync::Arc;

use async_trait::async_trait;
use floorwatch_core::session_store::{InMemorySessionStore, SessionStore, SessionStoreError};
use floorwatch_core::types::Session;
use redis::aio::ConnectionManager;
use tracing::warn;

use crate::config::{AppConfig, StoreBackend};
use crate::metrics::{PERSIST_ERROR, PERSIST_SUCCESS};

/// Redis-backed session store. Records are JSON documents under
/// `fw:session:{id}`; `fw:zone:{zone_id}:open` points at the zone's open
/// session and `fw:session_ids` is the listing index. Writes that touch
/// more than one key go through a transactional pipeline, so an open or
/// close is never partially applied.
pub struct RedisSessionStore {
    client: redis::Client,
}

const IDS_KEY: &str = "fw:session_ids";

fn session_key(id: &str) -> String {
    format!("fw:session:{id}")
}

fn open_key(zone_id: i64) -> String {
    format!("fw:zone:{zone_id}:open")
}

fn store_err(err: impl std::fmt::Display) -> SessionStoreError {
    SessionStoreError::Unavailable(err.to_string())
}

impl RedisSessionStore {
    pub fn connect(url: &str) -> Result<Self, SessionStoreError> {
        let client = redis::Client::open(url).map_err(store_err)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<ConnectionManager, SessionStoreError> {
        self.client.get_connection_manager().await.map_err(store_err)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, session: &Session) -> Result<(), SessionStoreError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(session).map_err(store_err)?;
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(session_key(&session.id))
            .arg(&payload)
            .ignore()
            .cmd("SET")
            .arg(open_key(session.zone_id))
            .arg(&session.id)
            .ignore()
            .cmd("SADD")
            .arg(IDS_KEY)
            .arg(&session.id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| {
                PERSIST_ERROR.with_label_values(&["insert"]).inc();
                store_err(e)
            })?;
        PERSIST_SUCCESS.with_label_values(&["insert"]).inc();
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<(), SessionStoreError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(session).map_err(store_err)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(session_key(&session.id))
            .arg(&payload)
            .ignore();
        if !session.is_open() {
            pipe.cmd("DEL").arg(open_key(session.zone_id)).ignore();
        }
        pipe.query_async::<()>(&mut conn).await.map_err(|e| {
            PERSIST_ERROR.with_label_values(&["update"]).inc();
            store_err(e)
        })?;
        PERSIST_SUCCESS.with_label_values(&["update"]).inc();
        Ok(())
    }

    async fn find_open(&self, zone_id: i64) -> Result<Option<Session>, SessionStoreError> {
        let mut conn = self.conn().await?;
        let id: Option<String> = redis::cmd("GET")
            .arg(open_key(zone_id))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        let Some(id) = id else {
            return Ok(None);
        };
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_key(&id))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        // An index entry pointing at a missing record reads as no open
        // session rather than an error.
        Ok(raw.and_then(|json| serde_json::from_str(&json).ok()))
    }

    async fn list(&self) -> Result<Vec<Session>, SessionStoreError> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = redis::cmd("SMEMBERS")
            .arg(IDS_KEY)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| session_key(id)).collect();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(values
            .into_iter()
            .flatten()
            .filter_map(|json| serde_json::from_str(&json).ok())
            .collect())
    }
}

/// Pick the session store for this deployment: Redis when configured and
/// reachable at client construction, in-memory otherwise.
pub fn build_session_store(cfg: &AppConfig) -> Arc<dyn SessionStore> {
    if cfg.store_backend == StoreBackend::Redis {
        if let Some(url) = cfg.redis_url.as_deref() {
            match RedisSessionStore::connect(url) {
                Ok(store) => return Arc::new(store),
                Err(err) => {
                    warn!(error = %err, "failed to init redis session store; falling back to memory")
                }
            }
        } else {
            warn!("FLOORWATCH_STORE_BACKEND=redis but REDIS_URL missing; falling back to in-memory");
        }
    }
    InMemorySessionStore::new()
}
