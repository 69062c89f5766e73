//! Core domain types, ports and base repositories for keystone.
//!
//! Concrete repositories compose [`BaseRepository`] (and optionally
//! [`CachedRepository`]) over the [`EntityStore`] and [`CacheStore`] ports.
//! Adapter crates (`keystone-db`, `keystone-cache`) implement the ports; the
//! composition root constructs the handles once and passes them down.
#![deny(unused_crate_dependencies)]

pub mod cache;
pub mod config;
pub mod domain;
pub mod ports;
pub mod query;
pub mod repository;

// Re-export commonly used types for convenience
pub use cache::{CachedRepository, cache_key};
pub use config::{AppConfig, AppEnv, ConfigError, validate_config};
pub use domain::{
    DEFAULT_PAGE_SIZE, Entity, EntityId, EntityMeta, MAX_PAGE_SIZE, PageWindow, Pagination,
    PaginationParams, SortOrder, sanitize_pagination,
};
pub use ports::{CacheError, CacheStore, CoreError, EntityStore, RepositoryError};
pub use query::{Filter, FindManyOptions, FindOneOptions, Match, OrderBy, Query};
pub use repository::{BaseRepository, EntityPatch};
