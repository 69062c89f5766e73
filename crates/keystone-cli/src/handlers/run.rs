//! Run command handler.
//!
//! Holds the process-wide handles open until Ctrl-C, then closes them.

use std::time::Duration;

use anyhow::{Context, Result};

use keystone_core::{AppConfig, cache_key};

use crate::bootstrap::Infra;

/// Execute the run command.
pub async fn execute(config: AppConfig) -> Result<()> {
    let infra = Infra::connect(config).await?;
    infra.check().await?;
    probe_cache(&infra).await?;

    tracing::info!(env = %infra.config.app_env, "Keystone ready; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    infra.shutdown().await;
    Ok(())
}

/// Write and read back a short-lived key through the cache helper.
async fn probe_cache(infra: &Infra) -> Result<()> {
    let cache = infra.cached_repository();
    let key = cache_key("keystone", &["startup-probe"]);

    cache
        .set_cache(&key, &std::process::id(), Duration::from_secs(5))
        .await?;
    let echoed: Option<u32> = cache.get_from_cache(&key).await?;
    cache.delete_cache(&key).await?;

    anyhow::ensure!(
        echoed == Some(std::process::id()),
        "Cache probe read back {echoed:?}"
    );
    Ok(())
}
