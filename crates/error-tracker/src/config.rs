//! Tracker configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use database::Environment;

use crate::error::TrackerConfigError;

/// Configuration for the error tracker and its notification pipeline.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Environment stamped on issues that don't name one.
    pub environment: Environment,
    /// Application name used in alert subjects.
    pub app_name: String,
    /// Capacity of the new-issue hand-off channel.
    pub handoff_capacity: usize,
    /// How long the panic hook waits for its log write.
    pub panic_log_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            app_name: "App".to_string(),
            handoff_capacity: 256,
            panic_log_timeout: Duration::from_secs(2),
        }
    }
}

impl TrackerConfig {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_handoff_capacity(mut self, capacity: usize) -> Self {
        self.handoff_capacity = capacity.max(1);
        self
    }

    /// Create configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `APP_ENV` | `development`, `test` or `production` | `development` |
    /// | `TRACKER_APP_NAME` | Name shown in alert subjects | `App` |
    /// | `TRACKER_HANDOFF_CAPACITY` | Pending new-issue evaluations | `256` |
    /// | `TRACKER_PANIC_LOG_TIMEOUT_MS` | Panic hook log budget | `2000` |
    pub fn from_env() -> Result<Self, TrackerConfigError> {
        let defaults = Self::default();

        let environment = match env::var("APP_ENV") {
            Ok(value) => value
                .parse()
                .map_err(|_| TrackerConfigError::InvalidValue { name: "APP_ENV", value })?,
            Err(_) => defaults.environment,
        };

        let handoff_capacity: usize = parse_var("TRACKER_HANDOFF_CAPACITY", defaults.handoff_capacity)?;
        let timeout_ms: u64 = parse_var(
            "TRACKER_PANIC_LOG_TIMEOUT_MS",
            defaults.panic_log_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            environment,
            app_name: env::var("TRACKER_APP_NAME").unwrap_or(defaults.app_name),
            handoff_capacity: handoff_capacity.max(1),
            panic_log_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, TrackerConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| TrackerConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
