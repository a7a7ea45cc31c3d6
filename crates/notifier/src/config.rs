//! Dispatcher configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use database::Environment;

use crate::error::{NotifierError, Result};
use crate::retry::RetryPolicy;

/// Default interval between retry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of rows a sweep picks up.
pub const DEFAULT_SWEEP_BATCH: u32 = 50;

/// Configuration for the notification dispatcher.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Controls what happens when a channel has no transport.
    pub environment: Environment,
    /// Retry limits and backoff.
    pub retry: RetryPolicy,
    /// How often the retry sweeper wakes up.
    pub sweep_interval: Duration,
    /// Maximum rows re-attempted per sweep.
    pub sweep_batch: u32,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            retry: RetryPolicy::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            sweep_batch: DEFAULT_SWEEP_BATCH,
        }
    }
}

impl NotifierConfig {
    /// Create a default configuration for the given environment.
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    /// Use a custom retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `APP_ENV` | `development`, `test` or `production` | `development` |
    /// | `NOTIFY_MAX_RETRIES` | Attempts before a notification fails | `3` |
    /// | `NOTIFY_RETRY_BACKOFF_SECS` | First retry delay, doubled per attempt | `30` |
    /// | `NOTIFY_RETRY_MAX_BACKOFF_SECS` | Backoff ceiling | `3600` |
    /// | `NOTIFY_SWEEP_INTERVAL_SECS` | Retry sweeper period | `60` |
    /// | `NOTIFY_SWEEP_BATCH` | Rows per sweep | `50` |
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("APP_ENV") {
            Ok(value) => value
                .parse()
                .map_err(|e| NotifierError::Config(format!("APP_ENV: {}", e)))?,
            Err(_) => Environment::default(),
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_retries: parse_var("NOTIFY_MAX_RETRIES", defaults.max_retries)?,
            base_backoff: Duration::from_secs(parse_var(
                "NOTIFY_RETRY_BACKOFF_SECS",
                defaults.base_backoff.as_secs(),
            )?),
            max_backoff: Duration::from_secs(parse_var(
                "NOTIFY_RETRY_MAX_BACKOFF_SECS",
                defaults.max_backoff.as_secs(),
            )?),
        };

        Ok(Self {
            environment,
            retry,
            sweep_interval: Duration::from_secs(parse_var(
                "NOTIFY_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL.as_secs(),
            )?),
            sweep_batch: parse_var("NOTIFY_SWEEP_BATCH", DEFAULT_SWEEP_BATCH)?,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| NotifierError::Config(format!("{} has an invalid value: {}", name, value))),
        Err(_) => Ok(default),
    }
}
