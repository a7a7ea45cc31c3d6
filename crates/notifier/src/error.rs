//! Error types for the notification dispatcher.

use database::{DatabaseError, NotificationStatus, ValidationError};
use thiserror::Error;

/// Errors returned by [`NotificationService`](crate::NotificationService).
#[derive(Debug, Error)]
pub enum NotifierError {
    /// Persistence failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// A recipient or the subject was rejected before anything was stored.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The notification's state does not allow a resend.
    #[error("notification {id} cannot be resent (status: {status})")]
    NotResendable {
        id: String,
        status: NotificationStatus,
    },

    /// A retry was requested for a notification that is no longer pending.
    #[error("notification {id} is not pending (status: {status})")]
    NotPending {
        id: String,
        status: NotificationStatus,
    },

    /// The request named no recipients.
    #[error("no recipients given")]
    NoRecipients,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, NotifierError>;
