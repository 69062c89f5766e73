//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bootstrap and maintenance commands for the keystone persistence layer.
#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "Bootstrap the keystone persistence layer")]
#[command(version)]
pub struct Cli {
    /// Load environment variables from this file instead of `.env`
    #[arg(long = "env-file", global = true, env = "KEYSTONE_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Enable debug logging (overridden by `RUST_LOG`)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Validate the environment configuration and print a summary
    CheckConfig,
    /// Create the tables for the given collections
    Migrate {
        /// Collection (table) name; repeat for several
        #[arg(long = "collection", short = 'c', required = true)]
        collections: Vec<String>,
    },
    /// Open the database and cache, verify them, and hold them until Ctrl-C
    Run,
}
