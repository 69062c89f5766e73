//! Redis cache store for keystone.
//!
//! Implements the [`keystone_core::CacheStore`] port over a Redis
//! connection manager.
#![deny(unsafe_code)]

mod redis_cache_store;

pub use redis_cache_store::{RedisCacheStore, map_redis_error};
