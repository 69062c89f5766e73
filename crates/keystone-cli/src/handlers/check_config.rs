//! Check-config command handler.

use keystone_core::AppConfig;

/// Render the configuration summary printed by `check-config`.
pub fn summary(config: &AppConfig) -> String {
    format!(
        "Configuration OK\n  environment:  {}\n  database:     {}\n  redis:        {}\n  cache ttl:    {}s",
        config.app_env,
        config.database_url,
        config.redis_url(),
        config.cache_ttl_secs,
    )
}

/// Execute the check-config command.
pub fn execute(config: &AppConfig) {
    println!("{}", summary(config));
}
