//! Server configuration from environment variables.

use std::time::Duration;

use linkstash_core::{defaults, Error, Result};

/// Settings read once at startup.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `DATABASE_URL` | *(required)* | PostgreSQL connection string |
/// | `HOST` | `0.0.0.0` | Bind address (IP or hostname) |
/// | `PORT` | `8080` | Listen port |
/// | `APP_ENV` | `development` | Deployment environment name |
/// | `RUN_MIGRATIONS` | `true` | Apply pending migrations on startup |
/// | `REQUEUE_INTERVAL_SECS` | `60` | Period of the sweep that re-enqueues orphaned bookmarks; `0` disables it |
///
/// Variables set to an empty string are treated as unset. Pool size
/// (`DB_MAX_CONNECTIONS`) and the per-operation deadline
/// (`OPERATION_TIMEOUT_SECS`) are read by `PoolConfig::from_env` and
/// `ServiceConfig::from_env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_env: String,
    pub run_migrations: bool,
    pub requeue_interval: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?;

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {}", raw)))?,
            None => defaults::HTTP_PORT,
        };

        let run_migrations = var("RUN_MIGRATIONS")
            .map(|v| !matches!(v.as_str(), "false" | "0"))
            .unwrap_or(true);

        let requeue_secs = match var("REQUEUE_INTERVAL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::Config(format!("REQUEUE_INTERVAL_SECS is not a number: {}", raw))
            })?,
            None => defaults::REQUEUE_INTERVAL_SECS,
        };

        Ok(Self {
            database_url,
            host: var("HOST").unwrap_or_else(|| defaults::HTTP_HOST.to_string()),
            port,
            app_env: var("APP_ENV").unwrap_or_else(|| defaults::APP_ENV.to_string()),
            run_migrations,
            requeue_interval: (requeue_secs > 0).then(|| Duration::from_secs(requeue_secs)),
        })
    }

    /// `host:port` for `TcpListener::bind`, which also resolves hostnames.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
