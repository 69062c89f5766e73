//! Redis implementation of the `CacheStore` trait.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use keystone_core::{CacheError, CacheStore};

/// Keys requested per `SCAN` round trip.
const SCAN_COUNT: usize = 500;

/// Redis implementation of the `CacheStore` trait.
///
/// Wraps a `ConnectionManager`, which reconnects on failure and is cheap to
/// clone, so one store is shared by every repository for the process
/// lifetime.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    /// Connect to Redis at `url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;

        tracing::info!("Redis connection manager ready");
        Ok(Self { conn })
    }

    /// Round-trip a `PING` to verify connectivity.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

/// Map Redis errors to `CacheError`.
pub fn map_redis_error(e: redis::RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        CacheError::Connection(e.to_string())
    } else {
        CacheError::Command(e.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(keys).await.map_err(map_redis_error)?;
        tracing::debug!(requested = keys.len(), removed, "Deleted cache keys");
        Ok(())
    }

    /// Walks the keyspace with `SCAN` rather than the blocking `KEYS`.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may report a key more than once while the keyspace is rehashed
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}
