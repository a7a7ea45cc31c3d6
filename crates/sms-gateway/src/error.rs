//! Error types for sms-gateway.

use thiserror::Error;
use transport_core::TransportError;

/// Errors that can occur when talking to the SMS gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON-RPC error response from the gateway.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Connection to the gateway failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Gateway health check failed.
    #[error("Health check failed")]
    HealthCheckFailed,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GatewayError> for TransportError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Http(e) if e.is_timeout() => TransportError::Timeout,
            GatewayError::Rpc { code, message } => {
                TransportError::Rejected(format!("RPC error {}: {}", code, message))
            }
            GatewayError::Config(msg) => TransportError::Configuration(msg),
            other => TransportError::Unavailable(other.to_string()),
        }
    }
}
