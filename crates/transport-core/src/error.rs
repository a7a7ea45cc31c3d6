//! Error types for transport operations.

use thiserror::Error;

/// Errors that can occur while handing a message to a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend is temporarily unavailable.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// The recipient address could not be used.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The backend is misconfigured.
    #[error("transport misconfigured: {0}")]
    Configuration(String),

    /// The attempt timed out.
    #[error("delivery timed out")]
    Timeout,
}
