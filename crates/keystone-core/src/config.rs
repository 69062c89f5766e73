//! Process configuration read from the environment.
//!
//! Loaded and validated once at startup by the composition root. Nothing
//! downstream re-reads or re-validates it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default `SQLite` database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://keystone.db";

pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default cache entry lifetime in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Highest Redis logical database index accepted.
pub const MAX_REDIS_DB: u8 = 15;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: other.to_string(),
                reason: "expected development, production or test".to_string(),
            }),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        })
    }
}

/// Validated process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app_env: AppEnv,
    pub database_url: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: u8,
    pub cache_ttl_secs: u64,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_env = get("APP_ENV")
            .ok_or(ConfigError::Missing("APP_ENV"))?
            .parse::<AppEnv>()?;

        let config = Self {
            app_env,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            redis_host: get("REDIS_HOST").unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
            redis_port: parse_or("REDIS_PORT", get("REDIS_PORT"), DEFAULT_REDIS_PORT)?,
            redis_db: parse_or("REDIS_DB", get("REDIS_DB"), 0)?,
            cache_ttl_secs: parse_or(
                "CACHE_TTL_SECONDS",
                get("CACHE_TTL_SECONDS"),
                DEFAULT_CACHE_TTL_SECS,
            )?,
        };

        validate_config(&config)?;
        Ok(config)
    }

    /// Connection URL for the Redis client.
    pub fn redis_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        )
    }

    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Database URL cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Cache TTL must be at least 1 second, got {0}")]
    InvalidTtl(u64),

    #[error("Redis database index must be between 0 and 15, got {0}")]
    InvalidRedisDb(u8),
}

/// Validate configuration values.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.database_url.trim().is_empty() {
        return Err(ConfigError::EmptyDatabaseUrl);
    }

    if config.cache_ttl_secs == 0 {
        return Err(ConfigError::InvalidTtl(config.cache_ttl_secs));
    }

    if config.redis_db > MAX_REDIS_DB {
        return Err(ConfigError::InvalidRedisDb(config.redis_db));
    }

    Ok(())
}
