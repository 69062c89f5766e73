//! `SQLite` entity store for keystone.
//!
//! Implements the [`keystone_core::EntityStore`] port over `sqlx` and
//! provides database setup for the composition root.
#![deny(unsafe_code)]

pub mod factory;
pub mod setup;
pub mod stores;

// Re-export factory for convenient access
pub use factory::StoreFactory;

// Re-export store implementations
pub use stores::{SqliteEntityStore, ensure_collection};

// Re-export setup functions for convenient access
pub use setup::{check_connection, migrate, setup_database};
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
