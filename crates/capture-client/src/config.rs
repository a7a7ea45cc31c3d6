//! Client capture configuration.

use std::env;

use crate::error::CaptureError;
use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Path of the ingest endpoint on the server.
pub const INGEST_PATH: &str = "/api/errors";

/// Configuration for [`ClientCapture`](crate::ClientCapture).
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Full URL reports are posted to.
    pub ingest_url: String,
    /// Unsent reports kept for retry.
    pub queue_capacity: usize,
}

impl CaptureConfig {
    /// Configuration for a server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            ingest_url: format!("{}{}", base_url.trim_end_matches('/'), INGEST_PATH),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CAPTURE_SERVER_URL` | Base URL of the tracker server | (required) |
    pub fn from_env() -> Result<Self, CaptureError> {
        let base_url = env::var("CAPTURE_SERVER_URL")
            .map_err(|_| CaptureError::Config("CAPTURE_SERVER_URL not set".to_string()))?;
        Ok(Self::new(base_url))
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}
