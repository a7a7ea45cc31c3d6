//! Decides whether a new issue alerts the admins, and sends the alert.

use std::fmt::Write as _;
use std::sync::Arc;

use database::{admin_settings, AdminSettings, Issue, Level, NotificationCategory, Priority};
use notifier::{EmailRequest, NotificationService, NotifierError};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::directory::AdminDirectory;

/// What happened when a new issue was evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Email notifications are switched off.
    Disabled,
    /// The issue's level is below the configured threshold.
    BelowThreshold { level: Level, threshold: Level },
    /// Nobody to notify.
    NoRecipients,
    /// One alert was queued per admin.
    Notified { notification_ids: Vec<String> },
    /// Evaluation failed; the failure was logged.
    Failed { reason: String },
}

/// Whether an issue at `level` should alert under `settings`.
pub fn should_notify(level: Level, settings: &AdminSettings) -> bool {
    settings.email_notifications_enabled && level >= settings.notification_level
}

/// Delivery priority of an alert for an issue at `level`.
pub fn priority_for(level: Level) -> Priority {
    match level {
        Level::Error => Priority::Urgent,
        Level::Warning => Priority::High,
        Level::Info | Level::Debug => Priority::Normal,
    }
}

/// A rendered alert email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Render the alert email for a new issue.
pub fn render_alert(issue: &Issue, app_name: &str) -> Alert {
    let subject = format!(
        "[{}] New {}: {}",
        app_name,
        issue.level,
        truncate(&issue.title, 120)
    );

    let mut rows: Vec<(&str, String)> = vec![
        ("Title", issue.title.clone()),
        ("Message", issue.message.clone()),
        ("Level", issue.level.to_string()),
        ("Environment", issue.environment.clone()),
    ];
    if let Some(url) = &issue.url {
        rows.push(("URL", url.clone()));
    }
    rows.push(("Occurrences", issue.count.to_string()));
    rows.push(("First seen", issue.first_seen_at.to_rfc3339()));
    if let Some(user_id) = &issue.user_id {
        rows.push(("User", user_id.clone()));
    }

    let mut text = format!("A new issue was recorded in {}.\n\n", app_name);
    for (label, value) in &rows {
        let _ = writeln!(text, "{}: {}", label, value);
    }
    if let Some(stack) = &issue.stack {
        let _ = write!(text, "\nStack trace:\n{}\n", stack);
    }

    let mut html = format!(
        "<h2>New issue in {}</h2>\n<table>\n",
        escape_html(app_name)
    );
    for (label, value) in &rows {
        let _ = writeln!(
            html,
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
            label,
            escape_html(value)
        );
    }
    html.push_str("</table>\n");
    if let Some(stack) = &issue.stack {
        let _ = write!(html, "<h3>Stack trace</h3>\n<pre>{}</pre>\n", escape_html(stack));
    }

    Alert { subject, text, html }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Evaluates new issues against the admin settings and alerts admins.
pub struct NotificationPolicy {
    pool: SqlitePool,
    directory: Arc<dyn AdminDirectory>,
    notifier: NotificationService,
    app_name: String,
}

impl NotificationPolicy {
    pub fn new(
        pool: SqlitePool,
        directory: Arc<dyn AdminDirectory>,
        notifier: NotificationService,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            directory,
            notifier,
            app_name: app_name.into(),
        }
    }

    /// Evaluate one newly created issue.
    ///
    /// Never fails: errors are logged and reported as [`PolicyOutcome::Failed`].
    pub async fn evaluate(&self, issue: &Issue) -> PolicyOutcome {
        match self.try_evaluate(issue).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(issue_id = %issue.id, "Failed to evaluate notification policy: {}", e);
                PolicyOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_evaluate(&self, issue: &Issue) -> Result<PolicyOutcome, NotifierError> {
        let settings = admin_settings::get_or_create_settings(&self.pool).await?;

        if !settings.email_notifications_enabled {
            debug!(issue_id = %issue.id, "Email notifications disabled");
            return Ok(PolicyOutcome::Disabled);
        }
        if !should_notify(issue.level, &settings) {
            debug!(
                issue_id = %issue.id,
                level = %issue.level,
                threshold = %settings.notification_level,
                "Issue below notification threshold"
            );
            return Ok(PolicyOutcome::BelowThreshold {
                level: issue.level,
                threshold: settings.notification_level,
            });
        }

        let admins = self.directory.admin_recipients().await?;
        if admins.is_empty() {
            warn!(issue_id = %issue.id, "No admins with an email address to notify");
            return Ok(PolicyOutcome::NoRecipients);
        }

        let alert = render_alert(issue, &self.app_name);
        let mut notification_ids = Vec::with_capacity(admins.len());
        let mut last_error = None;

        for admin in admins {
            let request = EmailRequest::new(admin.email.as_str(), &alert.subject, &alert.text)
                .with_html(&alert.html)
                .with_category(NotificationCategory::ErrorNotification)
                .with_priority(priority_for(issue.level));

            match self.notifier.send_email(request).await {
                Ok(ids) => notification_ids.extend(ids),
                Err(e) => {
                    warn!(admin = %admin.id, "Failed to queue error alert: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if notification_ids.is_empty() => Err(e),
            _ => {
                info!(
                    issue_id = %issue.id,
                    alerts = notification_ids.len(),
                    "Admins notified of new issue"
                );
                Ok(PolicyOutcome::Notified { notification_ids })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use database::{IssueStatus, Metadata};
    use sqlx::types::Json;

    fn issue(level: Level) -> Issue {
        let now = Utc::now();
        Issue {
            id: "issue-1".to_string(),
            fingerprint: "0123456789abcdef".to_string(),
            title: "TypeError".to_string(),
            message: "x is <undefined>".to_string(),
            stack: Some("at foo (app.js:1:1)".to_string()),
            level,
            status: IssueStatus::Open,
            count: 1,
            first_seen_at: now,
            last_seen_at: now,
            url: Some("https://app.example.com/settings".to_string()),
            user_agent: None,
            user_id: Some("user-7".to_string()),
            environment: "production".to_string(),
            tags: Json(vec![]),
            metadata: Json(Metadata::new()),
            resolved_at: None,
            resolved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn settings(enabled: bool, threshold: Level) -> AdminSettings {
        AdminSettings {
            email_notifications_enabled: enabled,
            notification_level: threshold,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_threshold() {
        for &threshold in Level::ALL {
            for &level in Level::ALL {
                assert_eq!(
                    should_notify(level, &settings(true, threshold)),
                    level >= threshold
                );
                assert!(!should_notify(level, &settings(false, threshold)));
            }
        }
    }

    #[test]
    fn test_priority_mapping() {
        assert_eq!(priority_for(Level::Error), Priority::Urgent);
        assert_eq!(priority_for(Level::Warning), Priority::High);
        assert_eq!(priority_for(Level::Info), Priority::Normal);
        assert_eq!(priority_for(Level::Debug), Priority::Normal);
    }

    #[test]
    fn test_render_alert() {
        let alert = render_alert(&issue(Level::Error), "Starter");

        assert_eq!(alert.subject, "[Starter] New error: TypeError");
        assert!(alert.text.contains("Message: x is <undefined>"));
        assert!(alert.text.contains("URL: https://app.example.com/settings"));
        assert!(alert.text.contains("User: user-7"));
        assert!(alert.text.contains("Stack trace:\nat foo (app.js:1:1)"));
        assert!(alert.html.contains("x is &lt;undefined&gt;"));
        assert!(!alert.html.contains("<undefined>"));
    }

    #[test]
    fn test_truncate_long_titles() {
        let mut long = issue(Level::Error);
        long.title = "é".repeat(200);
        let alert = render_alert(&long, "App");
        assert!(alert.subject.ends_with("..."));
        assert!(alert.subject.chars().count() < 150);
    }
}
