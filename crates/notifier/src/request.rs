//! Send requests accepted by the dispatcher.

use chrono::{DateTime, Utc};
use database::{NotificationCategory, Priority};
use serde::{Deserialize, Serialize};

/// One recipient or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    /// Flatten into a list, dropping blank entries.
    pub fn into_vec(self) -> Vec<String> {
        let list = match self {
            Recipients::One(recipient) => vec![recipient],
            Recipients::Many(recipients) => recipients,
        };
        list.into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect()
    }
}

impl From<&str> for Recipients {
    fn from(recipient: &str) -> Self {
        Recipients::One(recipient.to_string())
    }
}

impl From<String> for Recipients {
    fn from(recipient: String) -> Self {
        Recipients::One(recipient)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(recipients: Vec<String>) -> Self {
        Recipients::Many(recipients)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(recipients: Vec<&str>) -> Self {
        Recipients::Many(recipients.into_iter().map(str::to_string).collect())
    }
}

fn default_category() -> NotificationCategory {
    NotificationCategory::System
}

/// Request to send an email to one or more recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub to: Recipients,
    pub subject: String,
    /// Plain text body.
    pub content: String,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template_data: Option<serde_json::Value>,
    #[serde(default = "default_category")]
    pub category: NotificationCategory,
    #[serde(default)]
    pub priority: Priority,
    /// Delay delivery until this time.
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sent_by: Option<String>,
    /// Overrides the configured retry limit.
    #[serde(default)]
    pub max_retries: Option<i64>,
}

impl EmailRequest {
    /// Create a plain text email request with default category and priority.
    pub fn new(to: impl Into<Recipients>, subject: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            content: content.into(),
            html_content: None,
            template_id: None,
            template_data: None,
            category: default_category(),
            priority: Priority::default(),
            scheduled_for: None,
            user_id: None,
            sent_by: None,
            max_retries: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_content = Some(html.into());
        self
    }

    pub fn with_category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn with_sent_by(mut self, actor: impl Into<String>) -> Self {
        self.sent_by = Some(actor.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Request to send a text message to one or more phone numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsRequest {
    pub to: Recipients,
    pub content: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template_data: Option<serde_json::Value>,
    #[serde(default = "default_category")]
    pub category: NotificationCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sent_by: Option<String>,
    #[serde(default)]
    pub max_retries: Option<i64>,
}

impl SmsRequest {
    /// Create a text message request with default category and priority.
    pub fn new(to: impl Into<Recipients>, content: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            content: content.into(),
            template_id: None,
            template_data: None,
            category: default_category(),
            priority: Priority::default(),
            scheduled_for: None,
            user_id: None,
            sent_by: None,
            max_retries: None,
        }
    }

    pub fn with_category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn with_sent_by(mut self, actor: impl Into<String>) -> Self {
        self.sent_by = Some(actor.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipients_accept_one_or_many() {
        let one: Recipients = serde_json::from_str(r#""a@example.com""#).unwrap();
        assert_eq!(one.into_vec(), vec!["a@example.com"]);

        let many: Recipients = serde_json::from_str(r#"["a@example.com", " ", "b@example.com "]"#).unwrap();
        assert_eq!(many.into_vec(), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_email_request_defaults() {
        let request: EmailRequest = serde_json::from_str(
            r#"{"to": "a@example.com", "subject": "Hi", "content": "Body"}"#,
        )
        .unwrap();
        assert_eq!(request.category, NotificationCategory::System);
        assert_eq!(request.priority, Priority::Normal);
        assert!(request.scheduled_for.is_none());

        let request: EmailRequest = serde_json::from_str(
            r#"{"to": ["a@example.com"], "subject": "Hi", "content": "Body",
                "category": "error-notification", "priority": "urgent"}"#,
        )
        .unwrap();
        assert_eq!(request.category, NotificationCategory::ErrorNotification);
        assert_eq!(request.priority, Priority::Urgent);
    }
}
