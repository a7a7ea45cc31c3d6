//! Route handlers for the admin and ingest API.

pub mod health;
pub mod ingest;
pub mod issues;
pub mod notifications;
pub mod settings;

use std::future::Future;

use axum::routing::{get, patch, post};
use axum::Router;
use error_tracker::ActionContext;

use crate::error::Result;
use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Ingest
        .route("/api/errors", post(ingest::ingest))
        // Issues
        .route("/api/issues", get(issues::list))
        .route("/api/issues/stats", get(issues::stats))
        .route("/api/issues/:id", get(issues::get))
        .route("/api/issues/:id/status", patch(issues::update_status))
        // Notifications
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/stats", get(notifications::stats))
        .route("/api/notifications/email", post(notifications::send_email))
        .route("/api/notifications/sms", post(notifications::send_sms))
        .route("/api/notifications/:id", get(notifications::get))
        .route("/api/notifications/:id/resend", post(notifications::resend))
        .route("/api/notifications/:id/delivered", post(notifications::delivered))
        .route("/api/notifications/:id/bounced", post(notifications::bounced))
        // Settings
        .route("/api/settings", get(settings::get).put(settings::update))
}

/// Run a mutating action. Server-side failures are recorded as issues;
/// rejected requests are not.
pub(crate) async fn tracked<T, F>(
    state: &AppState,
    action: &str,
    context: ActionContext,
    work: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let result = work.await;
    if let Err(e) = &result {
        if e.is_server_error() {
            state.capture.report(action, &context, &e.to_string()).await;
        }
    }
    result
}
