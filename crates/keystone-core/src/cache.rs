//! Read-through / invalidate helper over a [`CacheStore`].
//!
//! The store stays the source of truth; the cache is an optional accelerator
//! that a concrete repository may use or ignore. There is no locking,
//! stampede protection or negative caching here.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ports::{CacheError, CacheStore};

/// Separator between cache key segments.
pub const KEY_SEPARATOR: char = ':';

/// Join key segments, e.g. `cache_key("users", &["id", "42"])` → `users:id:42`.
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = String::from(prefix);
    for part in parts {
        key.push(KEY_SEPARATOR);
        key.push_str(part);
    }
    key
}

/// JSON-encoded values with explicit expiry.
#[derive(Clone)]
pub struct CachedRepository {
    cache: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl CachedRepository {
    pub fn new(cache: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { cache, default_ttl }
    }

    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Read and decode the value at `key`.
    ///
    /// A missing key is `Ok(None)`. A payload that no longer decodes as `V`
    /// is logged and also reported as a miss, so callers fall through to the
    /// store. Transport failures are returned.
    pub async fn get_from_cache<V: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<V>, CacheError> {
        let Some(raw) = self.cache.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Encode and write `value` at `key` with the given TTL.
    ///
    /// Sub-second TTLs are rounded up to one second.
    pub async fn set_cache<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload =
            serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.cache.set_ex(key, payload, ttl.as_secs().max(1)).await
    }

    /// Like [`Self::set_cache`] with the configured default TTL.
    pub async fn set_cache_default<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
    ) -> Result<(), CacheError> {
        self.set_cache(key, value, self.default_ttl).await
    }

    pub async fn delete_cache(&self, key: &str) -> Result<(), CacheError> {
        self.cache.delete(&[key.to_string()]).await
    }

    /// Delete every key matching a glob-style pattern.
    ///
    /// Issues no delete when nothing matches.
    pub async fn delete_cache_by_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        let keys = self.cache.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(());
        }
        self.cache.delete(&keys).await
    }
}
