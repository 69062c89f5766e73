//! Migrate command handler.

use anyhow::Result;

use keystone_core::AppConfig;
use keystone_db::{migrate, setup_database};

/// Execute the migrate command.
///
/// Only the database is opened; the cache is not needed to create tables.
pub async fn execute(config: &AppConfig, collections: &[String]) -> Result<()> {
    let pool = setup_database(&config.database_url).await?;
    let result = migrate(&pool, collections).await;
    pool.close().await;
    result?;

    println!("Created or verified {} collection(s).", collections.len());
    Ok(())
}
