//! Bootstrap binary support for keystone.
//!
//! Parses the command line, loads configuration, and wires the `SQLite`
//! and Redis adapters into the repository layer.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod bootstrap;
pub mod handlers;
pub mod logging;
pub mod parser;

// Re-export primary types for convenient access
pub use bootstrap::{Infra, load_config};
pub use parser::{Cli, Commands};
