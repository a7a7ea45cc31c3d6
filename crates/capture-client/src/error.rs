//! Error types for capture-client.

use thiserror::Error;

/// Errors that can occur while forwarding a report.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The ingest endpoint answered with a non-success status.
    #[error("ingest endpoint returned status {0}")]
    Status(u16),

    /// The sink is not usable.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
