//! The error tracker: records occurrences and hands new issues on.

use std::sync::Arc;

use chrono::Utc;
use database::{
    admin_settings, issue, AdminSettings, Issue, IssueFilter, IssueStats, IssueStatus, Level,
    NewOccurrence, Occurrence, Page, PageRequest,
};
use sqlx::SqlitePool;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::config::TrackerConfig;
use crate::fingerprint::fingerprint;
use crate::options::LogOptions;
use crate::policy::NotificationPolicy;
use crate::worker::PipelineEvent;

/// Where newly created issues go.
#[derive(Clone)]
pub(crate) enum Handoff {
    /// Nowhere; no notifications.
    Disabled,
    /// Onto the pipeline's bounded channel.
    Channel(mpsc::Sender<PipelineEvent>),
    /// Evaluated before `log` returns.
    Inline(Arc<NotificationPolicy>),
}

/// Records error occurrences as deduplicated issues.
///
/// Cheap to clone; clones share the pool and the hand-off.
#[derive(Clone)]
pub struct ErrorTracker {
    pool: SqlitePool,
    config: Arc<TrackerConfig>,
    handoff: Handoff,
}

impl ErrorTracker {
    /// A tracker that records issues without notifying anyone.
    pub fn new(pool: SqlitePool, config: TrackerConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            handoff: Handoff::Disabled,
        }
    }

    /// A tracker that evaluates the notification policy before `log` returns.
    pub fn with_inline_policy(pool: SqlitePool, config: TrackerConfig, policy: NotificationPolicy) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            handoff: Handoff::Inline(Arc::new(policy)),
        }
    }

    pub(crate) fn with_channel(
        pool: SqlitePool,
        config: TrackerConfig,
        sender: mpsc::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            handoff: Handoff::Channel(sender),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Log an occurrence. Returns the issue id, or `None` if it could not be
    /// stored; the failure itself is logged.
    pub async fn log(&self, title: &str, message: &str, options: LogOptions) -> Option<String> {
        match self.record(title, message, options).await {
            Ok(occurrence) => {
                let id = occurrence.issue.id.clone();
                if occurrence.is_new {
                    self.hand_off(occurrence.issue).await;
                }
                Some(id)
            }
            Err(e) => {
                error!(title = %title, "Failed to log error: {}", e);
                None
            }
        }
    }

    pub async fn log_error(&self, title: &str, message: &str, options: LogOptions) -> Option<String> {
        self.log(title, message, options.level(Level::Error)).await
    }

    pub async fn log_warning(&self, title: &str, message: &str, options: LogOptions) -> Option<String> {
        self.log(title, message, options.level(Level::Warning)).await
    }

    pub async fn log_info(&self, title: &str, message: &str, options: LogOptions) -> Option<String> {
        self.log(title, message, options.level(Level::Info)).await
    }

    pub async fn log_debug(&self, title: &str, message: &str, options: LogOptions) -> Option<String> {
        self.log(title, message, options.level(Level::Debug)).await
    }

    /// Store an occurrence without handing it on. Errors are returned.
    pub async fn record(&self, title: &str, message: &str, options: LogOptions) -> database::Result<Occurrence> {
        let fingerprint = options
            .fingerprint
            .unwrap_or_else(|| fingerprint(title, message, options.stack.as_deref()));

        let occurrence = NewOccurrence {
            fingerprint,
            title: title.to_string(),
            message: message.to_string(),
            stack: options.stack,
            level: options.level,
            url: options.url,
            user_agent: options.user_agent,
            user_id: options.user_id,
            environment: options
                .environment
                .unwrap_or(self.config.environment)
                .to_string(),
            tags: options.tags,
            metadata: options.metadata,
            seen_at: Utc::now(),
        };

        let recorded = issue::record_occurrence(&self.pool, &occurrence).await?;
        debug!(
            issue_id = %recorded.issue.id,
            fingerprint = %recorded.issue.fingerprint,
            count = recorded.issue.count,
            is_new = recorded.is_new,
            "Occurrence recorded"
        );
        Ok(recorded)
    }

    async fn hand_off(&self, issue: Issue) {
        match &self.handoff {
            Handoff::Disabled => {}
            Handoff::Inline(policy) => {
                let outcome = policy.evaluate(&issue).await;
                debug!(issue_id = %issue.id, outcome = ?outcome, "Notification policy evaluated");
            }
            Handoff::Channel(sender) => {
                let issue_id = issue.id.clone();
                match sender.try_send(PipelineEvent::NewIssue(Box::new(issue))) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            issue_id = %issue_id,
                            "Notification hand-off queue full; admins will not be alerted for this issue"
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        warn!(
                            issue_id = %issue_id,
                            "Notification pipeline stopped; admins will not be alerted for this issue"
                        );
                    }
                }
            }
        }
    }

    pub async fn list_issues(&self, filter: &IssueFilter, page: PageRequest) -> database::Result<Page<Issue>> {
        issue::list_issues(&self.pool, filter, page).await
    }

    pub async fn get_issue(&self, id: &str) -> database::Result<Issue> {
        issue::get_issue(&self.pool, id).await
    }

    pub async fn update_issue_status(
        &self,
        id: &str,
        status: IssueStatus,
        resolved_by: Option<&str>,
    ) -> database::Result<Issue> {
        issue::update_issue_status(&self.pool, id, status, resolved_by, Utc::now()).await
    }

    pub async fn issue_stats(&self) -> database::Result<IssueStats> {
        issue::issue_stats(&self.pool).await
    }

    /// Current notification settings, created with defaults on first read.
    pub async fn settings(&self) -> database::Result<AdminSettings> {
        admin_settings::get_or_create_settings(&self.pool).await
    }

    pub async fn update_settings(
        &self,
        email_notifications_enabled: bool,
        notification_level: Level,
        updated_by: Option<&str>,
    ) -> database::Result<AdminSettings> {
        admin_settings::update_settings(
            &self.pool,
            email_notifications_enabled,
            notification_level,
            updated_by,
            Utc::now(),
        )
        .await
    }
}

impl std::fmt::Debug for ErrorTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handoff = match self.handoff {
            Handoff::Disabled => "disabled",
            Handoff::Channel(_) => "channel",
            Handoff::Inline(_) => "inline",
        };
        f.debug_struct("ErrorTracker")
            .field("environment", &self.config.environment)
            .field("handoff", &handoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{Database, Environment};
    use serde_json::json;
    use std::time::Duration;

    async fn tracker() -> ErrorTracker {
        let db = Database::connect_in_memory().await.unwrap();
        ErrorTracker::new(db.pool().clone(), TrackerConfig::new(Environment::Test))
    }

    #[tokio::test]
    async fn test_same_error_deduplicates() {
        let tracker = tracker().await;

        let first = tracker
            .log_error("TypeError", "x is undefined", LogOptions::new().stack("at a\nat b"))
            .await
            .unwrap();
        let before = tracker.get_issue(&first).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = tracker
            .log_error("TypeError", "x is undefined", LogOptions::new().stack("at a\nat c"))
            .await
            .unwrap();
        assert_eq!(first, second);

        let after = tracker.get_issue(&first).await.unwrap();
        assert_eq!(after.count, 2);
        assert_eq!(after.first_seen_at, before.first_seen_at);
        assert!(after.last_seen_at > before.last_seen_at);
        assert_eq!(after.environment, "test");
    }

    #[tokio::test]
    async fn test_level_escalates_never_downgrades() {
        let tracker = tracker().await;

        let id = tracker.log_warning("Slow", "query took 3s", LogOptions::new()).await.unwrap();
        tracker.log_error("Slow", "query took 3s", LogOptions::new()).await.unwrap();
        assert_eq!(tracker.get_issue(&id).await.unwrap().level, Level::Error);

        tracker.log_info("Slow", "query took 3s", LogOptions::new()).await.unwrap();
        let issue = tracker.get_issue(&id).await.unwrap();
        assert_eq!(issue.level, Level::Error);
        assert_eq!(issue.count, 3);
    }

    #[tokio::test]
    async fn test_metadata_and_tags_merge() {
        let tracker = tracker().await;

        let id = tracker
            .log(
                "E",
                "m",
                LogOptions::new().tag("a").meta("build", "1").meta("region", "eu"),
            )
            .await
            .unwrap();
        tracker
            .log(
                "E",
                "m",
                LogOptions::new()
                    .tags(["a", "b"])
                    .meta("build", "2")
                    .url("https://example.com/x")
                    .user_id("u-1"),
            )
            .await
            .unwrap();

        let issue = tracker.get_issue(&id).await.unwrap();
        assert_eq!(issue.metadata.0["build"], json!("2"));
        assert_eq!(issue.metadata.0["region"], json!("eu"));
        assert_eq!(issue.metadata.0["lastOccurrence"]["url"], json!("https://example.com/x"));
        assert_eq!(issue.metadata.0["lastOccurrence"]["userId"], json!("u-1"));
        assert_eq!(issue.tags.0, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fingerprint_override_and_environment() {
        let tracker = tracker().await;

        let a = tracker
            .log("A", "one", LogOptions::new().fingerprint("custom-group"))
            .await
            .unwrap();
        let b = tracker
            .log(
                "B",
                "two",
                LogOptions::new()
                    .fingerprint("custom-group")
                    .environment(Environment::Production),
            )
            .await
            .unwrap();
        assert_eq!(a, b);

        let issue = tracker.get_issue(&a).await.unwrap();
        assert_eq!(issue.fingerprint, "custom-group");
        assert_eq!(issue.title, "A");
        assert_eq!(issue.count, 2);
    }

    #[tokio::test]
    async fn test_store_failure_returns_none() {
        let tracker = tracker().await;
        tracker.pool().close().await;

        assert!(tracker.log_error("E", "m", LogOptions::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_status_and_stats() {
        let tracker = tracker().await;

        let id = tracker.log_error("E", "m", LogOptions::new()).await.unwrap();
        tracker.log_warning("W", "m", LogOptions::new()).await.unwrap();

        let resolved = tracker
            .update_issue_status(&id, IssueStatus::Resolved, Some("admin-1"))
            .await
            .unwrap();
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.resolved_by.as_deref(), Some("admin-1"));

        let stats = tracker.issue_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status["resolved"], 1);
        assert_eq!(stats.by_level["warning"], 1);

        let open = tracker
            .list_issues(
                &IssueFilter {
                    status: Some(IssueStatus::Open),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(open.total, 1);
        assert_eq!(open.items[0].title, "W");
    }
}
