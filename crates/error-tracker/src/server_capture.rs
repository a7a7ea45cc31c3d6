//! Tracking failures of server actions and request handlers.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::LogOptions;
use crate::tracker::ErrorTracker;

/// Request context recorded alongside a failed action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    /// Action arguments. Only stored outside production.
    pub args: Option<Value>,
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }
}

/// Wraps fallible server work and logs its failures.
#[derive(Debug, Clone)]
pub struct ServerCapture {
    tracker: ErrorTracker,
}

impl ServerCapture {
    pub fn new(tracker: ErrorTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }

    /// Run `work`; if it fails, log the failure and return the original
    /// error unchanged.
    pub async fn capture<F, T, E>(&self, action: &str, context: ActionContext, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let result = work.await;
        if let Err(e) = &result {
            self.report(action, &context, &e.to_string()).await;
        }
        result
    }

    /// Log a failed action. Returns the issue id if it was stored.
    pub async fn report(&self, action: &str, context: &ActionContext, message: &str) -> Option<String> {
        let mut options = LogOptions::new()
            .tags(["server-action", action])
            .meta("action", action);

        if let Some(referrer) = &context.referrer {
            options = options.meta("referrer", referrer.as_str());
        }
        if let Some(user_agent) = &context.user_agent {
            options = options.meta("userAgent", user_agent.as_str());
            options.user_agent = Some(user_agent.clone());
        }
        if let (Some(args), false) = (&context.args, self.tracker.config().environment.is_production()) {
            options = options.meta("args", args.clone());
        }
        options.url = context.url.clone();
        options.user_id = context.user_id.clone();

        let title = format!("Server action failed: {}", action);
        self.tracker.log_error(&title, message, options).await
    }
}
