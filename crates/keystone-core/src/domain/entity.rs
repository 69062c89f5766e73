//! Entity identity and timestamps.
//!
//! Every persisted record embeds an [`EntityMeta`] and implements [`Entity`].
//! Identity is generated in application code before any write reaches the
//! store, so an entity can be referenced (cached, linked, logged) as soon as
//! it is constructed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::RepositoryError;

/// Globally unique, time-ordered entity identifier.
///
/// Wraps the canonical 36-character hyphenated form of a UUIDv7. The textual
/// form sorts lexicographically in creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Length of the textual identifier.
    pub const LEN: usize = 36;

    /// Generate a new identifier from the current time.
    ///
    /// Identifiers generated by the same process are ordered by creation.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().hyphenated().to_string())
    }

    /// Parse an identifier from its textual form.
    pub fn parse(value: &str) -> Result<Self, RepositoryError> {
        Uuid::try_parse(value)
            .map(|uuid| Self(uuid.hyphenated().to_string()))
            .map_err(|e| RepositoryError::InvalidQuery(format!("invalid id '{value}': {e}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity and timestamps shared by every entity.
///
/// Fields are private: `id` and `created_at` never change after
/// construction, and `updated_at` is refreshed by the store on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    id: EntityId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntityMeta {
    /// Fresh identity stamped with the current time.
    pub fn new() -> Self {
        Self::at(EntityId::generate(), Utc::now())
    }

    /// Identity with an explicit id and clock reading.
    pub const fn at(id: EntityId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }

    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A persisted record type.
///
/// Implementors embed [`EntityMeta`] with `#[serde(flatten)]` so the stored
/// document carries `id`, `created_at` and `updated_at` at the top level.
///
/// # Example
///
/// ```
/// use keystone_core::{Entity, EntityMeta};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     #[serde(flatten)]
///     meta: EntityMeta,
///     email: String,
/// }
///
/// impl Entity for User {
///     const COLLECTION: &'static str = "users";
///
///     fn meta(&self) -> &EntityMeta {
///         &self.meta
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection (table) the entity is stored in.
    const COLLECTION: &'static str;

    fn meta(&self) -> &EntityMeta;

    fn id(&self) -> &EntityId {
        self.meta().id()
    }
}

/// Document keys that a partial update must never overwrite.
pub const RESERVED_FIELDS: [&str; 2] = ["id", "created_at"];

/// Document key the store refreshes on every mutating write.
pub const UPDATED_AT_FIELD: &str = "updated_at";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_fixed_length() {
        let id = EntityId::generate();
        assert_eq!(id.as_str().len(), EntityId::LEN);
    }

    #[test]
    fn test_generated_ids_are_unique_and_ordered() {
        let ids: Vec<EntityId> = (0..500).map(|_| EntityId::generate()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_parse_round_trips_and_rejects_garbage() {
        let id = EntityId::generate();
        let parsed: EntityId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);

        assert!(matches!(
            EntityId::parse("not-an-id"),
            Err(RepositoryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_meta_timestamps_match_at_construction() {
        let meta = EntityMeta::new();
        assert_eq!(meta.created_at(), meta.updated_at());
    }

    #[test]
    fn test_meta_serializes_flat_fields() {
        let meta = EntityMeta::new();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["id"], meta.id().as_str());
        assert!(json.get("created_at").is_some());
        assert!(json.get("updated_at").is_some());
    }
}
