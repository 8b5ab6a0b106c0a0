//! Redis-backed session store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::errors::Result;
use crate::store::SessionStore;

/// Durable session store backed by an external Redis cache.
///
/// Keys are namespaced per session and carry a TTL that is refreshed on
/// every save, so idle sessions expire on their own. The connection manager
/// reconnects transparently; individual operations surface their errors for
/// the caller to handle.
pub struct RedisStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisStore {
    /// Connect to the cache at `url`.
    ///
    /// Failing here is fatal by design: a gateway configured for durable
    /// sessions must not come up without its cache.
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        debug!(ttl_secs = ttl.as_secs(), "connected to session cache");
        Ok(Self { conn, ttl })
    }

    /// Cache key for a session's counter.
    fn key(session_id: &str) -> String {
        format!("session:{session_id}:count")
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn load(&self, session_id: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn.get(Self::key(session_id)).await?;
        Ok(count.unwrap_or(0))
    }

    async fn save(&self, session_id: &str, count: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let () = conn
            .set_ex(Self::key(session_id), count, self.ttl.as_secs())
            .await?;
        Ok(())
    }

    fn durable(&self) -> bool {
        true
    }
}
