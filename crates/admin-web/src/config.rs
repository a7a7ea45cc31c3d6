//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Admin web server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// How often the SMS gateway is health-checked.
    pub gateway_health_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ADMIN_ADDR` | Server bind address | `127.0.0.1:8788` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:tracker.db?mode=rwc` |
    /// | `SMS_GATEWAY_HEALTH_SECS` | Gateway health check interval | `60` |
    ///
    /// Transports, the dispatcher and the tracker read their own variables
    /// (`SMTP_*`, `SMS_GATEWAY_*`, `NOTIFY_*`, `TRACKER_*`, `APP_ENV`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("ADMIN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8788".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:tracker.db?mode=rwc".to_string());

        let gateway_health_interval = match env::var("SMS_GATEWAY_HEALTH_SECS") {
            Ok(value) => Duration::from_secs(
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidHealthInterval)?,
            ),
            Err(_) => Duration::from_secs(60),
        };

        Ok(Self {
            addr,
            database_url,
            gateway_health_interval,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ADMIN_ADDR format")]
    InvalidAddr,

    #[error("SMS_GATEWAY_HEALTH_SECS must be a whole number of seconds")]
    InvalidHealthInterval,
}
