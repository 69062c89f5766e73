//! Entity store trait definition.
//!
//! This port is the boundary to durable persistence. One store instance is
//! bound to one entity type and its collection.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::RepositoryError;
use crate::domain::{Entity, EntityId};
use crate::query::{Filter, Query};

/// Durable storage for one entity type.
///
/// Implementations own the connection handling; callers share a store
/// through `Arc<dyn EntityStore<T>>` for the whole process lifetime.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Insert or replace entities by identity, refreshing `updated_at`.
    async fn upsert(&self, entities: &[T]) -> Result<(), RepositoryError>;

    /// Look up a single entity by identity.
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<T>, RepositoryError>;

    /// Remove entities by identity. Unknown ids are ignored.
    async fn delete_by_ids(&self, ids: &[EntityId]) -> Result<(), RepositoryError>;

    /// Remove every entity matching the filter.
    async fn delete_where(&self, filter: &Filter) -> Result<(), RepositoryError>;

    /// Merge fields into the stored document, refreshing `updated_at`.
    ///
    /// Does nothing when no entity exists at `id`. Fails with
    /// `Serialization` and writes nothing if the merged document would no
    /// longer decode as `T`.
    async fn merge(
        &self,
        id: &EntityId,
        fields: Map<String, Value>,
    ) -> Result<(), RepositoryError>;

    /// First entity matching the query, if any.
    async fn find_one(&self, query: &Query) -> Result<Option<T>, RepositoryError>;

    /// Every entity matching the query, within its window.
    async fn find(&self, query: &Query) -> Result<Vec<T>, RepositoryError>;

    /// Number of entities matching the filters.
    async fn count(&self, filters: &[Filter]) -> Result<u64, RepositoryError>;
}
