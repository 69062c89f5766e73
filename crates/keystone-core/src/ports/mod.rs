//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the base repositories expect from
//! infrastructure. They contain no implementation details.
//!
//! # Design Rules
//!
//! - No `sqlx` or `redis` types in any signature
//! - Absence on point lookups is `Ok(None)`, never an error
//! - Failures from the backend are returned unchanged, no retries

pub mod cache_store;
pub mod entity_store;

use thiserror::Error;

pub use cache_store::CacheStore;
pub use entity_store::EntityStore;

#[cfg(test)]
pub use cache_store::MockCacheStore;

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// and provides a clean interface for callers to handle storage failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The entity targeted by an update does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage backend error (connectivity, timeout, IO).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A constraint was violated (e.g., foreign key, unique constraint).
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A query referenced an invalid field, collection or identifier.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache could not be reached.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// The cache rejected a command.
    #[error("Cache command error: {0}")]
    Command(String),

    /// A value could not be encoded for the cache.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Core error type for semantic errors.
///
/// Adapters map this to their own error types (HTTP status codes, CLI exit
/// codes).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Cache operation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
