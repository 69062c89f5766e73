//! Bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together.
//! The database pool and the cache connection are created here once and
//! handed to everything else by reference or cheap clone:
//! - `SQLite` pool (via keystone-db)
//! - Redis cache store (via keystone-cache)
//! - Cache helper (via keystone-core)

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use keystone_cache::RedisCacheStore;
use keystone_core::{AppConfig, CachedRepository};
use keystone_db::{check_connection, setup_database};

/// Load `.env` (or the given file) into the process environment, then read
/// and validate the configuration.
///
/// A missing default `.env` is not an error; a missing explicit file is.
pub fn load_config(env_file: Option<&Path>) -> Result<AppConfig> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    AppConfig::from_env().context("Invalid configuration")
}

/// Process-wide handles shared by all repositories.
pub struct Infra {
    pub config: AppConfig,
    pub pool: SqlitePool,
    pub cache: Arc<RedisCacheStore>,
}

impl Infra {
    /// Open the database pool and the cache connection.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let pool = setup_database(&config.database_url).await?;
        let cache = RedisCacheStore::connect(&config.redis_url())
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            config,
            pool,
            cache: Arc::new(cache),
        })
    }

    /// Verify both handles answer.
    pub async fn check(&self) -> Result<()> {
        check_connection(&self.pool).await?;
        self.cache.ping().await.context("Redis health check failed")?;
        Ok(())
    }

    /// Cache helper over the shared connection, using the configured TTL.
    pub fn cached_repository(&self) -> CachedRepository {
        CachedRepository::new(self.cache.clone(), self.config.cache_ttl())
    }

    /// Close the pool. The cache connection closes when the last clone drops.
    pub async fn shutdown(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
