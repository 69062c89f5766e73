//! Entity store implementations using `SQLite`.
//!
//! These implementations encapsulate all SQL and database access. The
//! `SqlitePool` is confined to this crate and never appears in the port
//! trait signatures.

mod sql;
mod sqlite_entity_store;

pub use sql::map_sqlx_error;
pub use sqlite_entity_store::{SqliteEntityStore, ensure_collection};
