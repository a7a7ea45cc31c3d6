//! Error types for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use notifier::NotifierError;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Dispatcher error.
    #[error("{0}")]
    Notifier(#[from] NotifierError),

    /// The request was malformed.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    fn status(&self) -> StatusCode {
        match self {
            AdminError::Database(DatabaseError::NotFound { .. })
            | AdminError::Notifier(NotifierError::Database(DatabaseError::NotFound { .. })) => {
                StatusCode::NOT_FOUND
            }
            AdminError::Notifier(
                NotifierError::Validation(_)
                | NotifierError::NoRecipients
                | NotifierError::NotResendable { .. }
                | NotifierError::NotPending { .. },
            )
            | AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is our fault rather than the caller's.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = AdminError::Database(DatabaseError::NotFound {
            entity: "Issue",
            id: "x".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        assert_eq!(
            AdminError::Notifier(NotifierError::NoRecipients).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminError::Internal("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
