//! Database setup and initialization.
//!
//! This module provides `setup_database()` for opening the `SQLite` pool and
//! `migrate()` for creating collection tables. Entry points call these with
//! the configured database URL.

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::stores::ensure_collection;

/// Opens the `SQLite` connection pool.
///
/// Creates the database file if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed or the database cannot be
/// opened.
///
/// # Example
///
/// ```rust,no_run
/// use keystone_db::setup_database;
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = setup_database("sqlite://keystone.db").await?;
/// # Ok(())
/// # }
/// ```
pub async fn setup_database(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL '{database_url}'"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .with_context(|| format!("Failed to open database '{database_url}'"))?;

    tracing::info!(url = database_url, "Database pool ready");
    Ok(pool)
}

/// Creates the tables for the given collections.
///
/// Safe to call repeatedly; every statement is `IF NOT EXISTS`.
pub async fn migrate(pool: &SqlitePool, collections: &[String]) -> Result<()> {
    for collection in collections {
        ensure_collection(pool, collection)
            .await
            .with_context(|| format!("Failed to create collection '{collection}'"))?;
    }
    tracing::info!(count = collections.len(), "Collections ready");
    Ok(())
}

/// Verifies the pool can run a statement.
pub async fn check_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Sets up an in-memory `SQLite` database for testing.
///
/// The pool holds a single connection that never expires, since every
/// in-memory connection is a separate database.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_creates_tables_idempotently() {
        let pool = setup_test_database().await.unwrap();
        let collections = vec!["users".to_string(), "sessions".to_string()];

        migrate(&pool, &collections).await.unwrap();
        migrate(&pool, &collections).await.unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_migrate_rejects_bad_collection() {
        let pool = setup_test_database().await.unwrap();
        let result = migrate(&pool, &["users; --".to_string()]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_check_connection() {
        let pool = setup_test_database().await.unwrap();
        check_connection(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_setup_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystone.db");
        let url = format!("sqlite://{}", path.display());

        let pool = setup_database(&url).await.unwrap();
        check_connection(&pool).await.unwrap();
        pool.close().await;

        assert!(path.exists());
    }
}
