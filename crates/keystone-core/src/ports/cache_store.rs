//! Key-value cache trait definition.

use async_trait::async_trait;

use super::CacheError;

/// TTL-capable key-value cache holding string payloads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Raw value at `key`, or `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write `value` at `key`, expiring after `ttl_secs` seconds.
    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError>;

    /// Remove the given keys.
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Keys matching a glob-style pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;
}
