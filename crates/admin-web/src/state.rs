//! Application state shared across handlers.

use axum::http::{header, HeaderMap, Uri};
use database::Database;
use error_tracker::{ActionContext, ErrorTracker, ServerCapture};
use notifier::NotificationService;
use serde::Serialize;
use sms_gateway::SmsClient;

/// Header carrying the acting admin's id, set by the auth proxy in front of
/// this service.
pub const ACTOR_HEADER: &str = "x-user-id";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Issue store.
    pub tracker: ErrorTracker,
    /// Notification dispatcher.
    pub notifier: NotificationService,
    /// Records handler failures as issues.
    pub capture: ServerCapture,
    /// SMS gateway, when one is configured.
    pub sms_gateway: Option<SmsClient>,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, tracker: ErrorTracker, notifier: NotificationService) -> Self {
        let capture = ServerCapture::new(tracker.clone());
        Self {
            db,
            tracker,
            notifier,
            capture,
            sms_gateway: None,
        }
    }

    /// Report this gateway's connectivity from `/health`.
    pub fn with_sms_gateway(mut self, client: SmsClient) -> Self {
        self.sms_gateway = Some(client);
        self
    }
}

fn header_value(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The acting user, if the request names one.
pub fn actor(headers: &HeaderMap) -> Option<String> {
    header_value(headers, ACTOR_HEADER).filter(|s| !s.trim().is_empty())
}

/// Request context for [`ServerCapture`].
pub fn action_context(headers: &HeaderMap, uri: &Uri) -> ActionContext {
    ActionContext {
        url: Some(uri.to_string()),
        referrer: header_value(headers, header::REFERER),
        user_agent: header_value(headers, header::USER_AGENT),
        user_id: actor(headers),
        args: None,
    }
}

/// Attach the action's request body to `context`.
pub fn with_request_args(context: ActionContext, request: &impl Serialize) -> ActionContext {
    match serde_json::to_value(request) {
        Ok(args) => context.with_args(args),
        Err(_) => context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifier::EmailRequest;

    #[test]
    fn test_action_context_carries_request_body() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, "admin-1".parse().unwrap());
        let uri: Uri = "/api/notifications/email".parse().unwrap();

        let request: EmailRequest = serde_json::from_value(serde_json::json!({
            "to": ["ops@example.com"],
            "subject": "Deploy finished",
            "content": "All green",
        }))
        .unwrap();
        let context = with_request_args(action_context(&headers, &uri), &request);

        assert_eq!(context.user_id.as_deref(), Some("admin-1"));
        assert_eq!(context.url.as_deref(), Some("/api/notifications/email"));
        let args = context.args.unwrap();
        assert_eq!(args["subject"], "Deploy finished");
        assert_eq!(args["to"][0], "ops@example.com");
    }
}
