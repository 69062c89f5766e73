//! Tests against a running Redis server.
//!
//! Ignored by default. Run with:
//! `KEYSTONE_TEST_REDIS_URL=redis://localhost:6379/15 cargo test -p keystone-cache -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use keystone_cache::RedisCacheStore;
use keystone_core::{CacheStore, CachedRepository};

async fn live_repo() -> (RedisCacheStore, CachedRepository) {
    let url = std::env::var("KEYSTONE_TEST_REDIS_URL")
        .unwrap_or_else(|_| "redis://localhost:6379/15".to_string());
    let store = RedisCacheStore::connect(&url).await.unwrap();
    store.ping().await.unwrap();
    let repo = CachedRepository::new(Arc::new(store.clone()), Duration::from_secs(30));
    (store, repo)
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_round_trip_and_delete() {
    let (_, repo) = live_repo().await;

    repo.set_cache("keystone:test:one", &vec![1, 2, 3], Duration::from_secs(30))
        .await
        .unwrap();
    let cached: Option<Vec<u32>> = repo.get_from_cache("keystone:test:one").await.unwrap();
    assert_eq!(cached, Some(vec![1, 2, 3]));

    repo.delete_cache("keystone:test:one").await.unwrap();
    let gone: Option<Vec<u32>> = repo.get_from_cache("keystone:test:one").await.unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_delete_by_pattern() {
    let (store, repo) = live_repo().await;

    for i in 0..5 {
        repo.set_cache_default(&format!("keystone:pattern:{i}"), &i)
            .await
            .unwrap();
    }
    repo.set_cache_default("keystone:other", &"keep").await.unwrap();

    repo.delete_cache_by_pattern("keystone:pattern:*").await.unwrap();

    assert!(store.keys("keystone:pattern:*").await.unwrap().is_empty());
    let kept: Option<String> = repo.get_from_cache("keystone:other").await.unwrap();
    assert_eq!(kept.as_deref(), Some("keep"));

    repo.delete_cache_by_pattern("keystone:nothing:*").await.unwrap();
    repo.delete_cache("keystone:other").await.unwrap();
}
