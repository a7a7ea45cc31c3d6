//! Error types for tracker configuration.

use thiserror::Error;

/// Errors raised while reading tracker configuration.
#[derive(Debug, Error)]
pub enum TrackerConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}
