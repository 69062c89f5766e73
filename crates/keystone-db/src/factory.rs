//! Composition utilities for building repositories over `SQLite`.
//!
//! This module is focused purely on construction and should not contain any
//! domain logic.

use std::sync::Arc;

use sqlx::SqlitePool;

use keystone_core::{BaseRepository, Entity, EntityStore, RepositoryError};

use crate::stores::SqliteEntityStore;

/// Factory for creating stores and repositories with `SQLite` backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Create the store for an entity type, wrapped for sharing.
    pub fn store<T: Entity>(pool: SqlitePool) -> Result<Arc<dyn EntityStore<T>>, RepositoryError> {
        Ok(Arc::new(SqliteEntityStore::<T>::new(pool)?))
    }

    /// Create a base repository for an entity type.
    ///
    /// The collection table must already exist (see [`crate::migrate`]).
    pub fn repository<T: Entity>(pool: SqlitePool) -> Result<BaseRepository<T>, RepositoryError> {
        Ok(BaseRepository::new(Self::store(pool)?))
    }

    /// Create a base repository, creating its table first if needed.
    pub async fn prepared_repository<T: Entity>(
        pool: SqlitePool,
    ) -> Result<BaseRepository<T>, RepositoryError> {
        let store = SqliteEntityStore::<T>::new(pool)?;
        store.ensure_table().await?;
        Ok(BaseRepository::new(Arc::new(store)))
    }
}
