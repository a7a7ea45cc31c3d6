//! Database models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Free-form issue metadata. Merging is shallow: a new key replaces the old value.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Error returned when parsing an enum from an unknown string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored string form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Deployment environment the tracker runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

text_enum!(Environment, "environment", {
    Development => "development",
    Test => "test",
    Production => "production",
});

impl Environment {
    /// Whether this is the production environment.
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Severity of an issue.
///
/// Variants are declared in ascending severity so the derived ordering is
/// `Debug < Info < Warning < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
}

text_enum!(Level, "level", {
    Debug => "debug",
    Info => "info",
    Warning => "warning",
    Error => "error",
});

impl Level {
    /// Combine an existing level with an incoming one. Never downgrades.
    pub fn escalate(self, incoming: Level) -> Level {
        self.max(incoming)
    }
}

/// Lifecycle state of an issue. Transitions are admin-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    Open,
    Resolved,
    Closed,
}

text_enum!(IssueStatus, "issue status", {
    Open => "open",
    Resolved => "resolved",
    Closed => "closed",
});

/// A deduplicated group of error occurrences sharing a fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    /// Stable hash identifying the error's shape. Unique.
    pub fingerprint: String,
    pub title: String,
    pub message: String,
    pub stack: Option<String>,
    pub level: Level,
    pub status: IssueStatus,
    /// Number of occurrences, at least 1.
    pub count: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub environment: String,
    pub tags: Json<Vec<String>>,
    pub metadata: Json<Metadata>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single occurrence to be folded into the issue table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOccurrence {
    pub fingerprint: String,
    pub title: String,
    pub message: String,
    pub stack: Option<String>,
    pub level: Level,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub environment: String,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub seen_at: DateTime<Utc>,
}

/// Singleton notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    pub email_notifications_enabled: bool,
    /// Minimum level that triggers an admin notification.
    pub notification_level: Level,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Delivery channel of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Sms,
}

text_enum!(NotificationType, "notification type", {
    Email => "email",
    Sms => "sms",
});

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum NotificationCategory {
    Auth,
    ErrorNotification,
    System,
    Security,
    Marketing,
    Reminder,
}

text_enum!(NotificationCategory, "notification category", {
    Auth => "auth",
    ErrorNotification => "error-notification",
    System => "system",
    Security => "security",
    Marketing => "marketing",
    Reminder => "reminder",
});

/// Delivery priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

text_enum!(Priority, "priority", {
    Low => "low",
    Normal => "normal",
    High => "high",
    Urgent => "urgent",
});

/// Delivery state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Delivered,
    Bounced,
}

text_enum!(NotificationStatus, "notification status", {
    Pending => "pending",
    Sent => "sent",
    Failed => "failed",
    Delivered => "delivered",
    Bounced => "bounced",
});

/// One outbound delivery record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient: String,
    pub subject: Option<String>,
    pub content: String,
    pub html_content: Option<String>,
    pub template_id: Option<String>,
    pub template_data: Option<Json<serde_json::Value>>,
    pub category: NotificationCategory,
    pub priority: Priority,
    pub status: NotificationStatus,
    pub retry_count: i64,
    pub max_retries: i64,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub provider_response: Option<Json<serde_json::Value>>,
    /// Target user, if the recipient maps to one.
    pub user_id: Option<String>,
    /// Actor that triggered a manual send or resend.
    pub sent_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Whether a resend is allowed from the current state.
    pub fn can_resend(&self) -> bool {
        matches!(
            self.status,
            NotificationStatus::Failed | NotificationStatus::Bounced
        ) || self.retry_count < self.max_retries
    }
}

/// Fields needed to create a notification row. New rows start pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub notification_type: NotificationType,
    pub recipient: String,
    pub subject: Option<String>,
    pub content: String,
    pub html_content: Option<String>,
    pub template_id: Option<String>,
    pub template_data: Option<serde_json::Value>,
    pub category: NotificationCategory,
    pub priority: Priority,
    pub max_retries: i64,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub sent_by: Option<String>,
}

/// Role of a user in the admin roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

text_enum!(UserRole, "user role", {
    Admin => "admin",
    User => "user",
});

/// A user known to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
    }

    #[test]
    fn test_escalation_never_downgrades() {
        for &existing in Level::ALL {
            for &incoming in Level::ALL {
                let result = existing.escalate(incoming);
                assert!(result >= existing);
                assert_eq!(result, existing.max(incoming));
            }
        }
    }

    #[test]
    fn test_enum_text_forms() {
        assert_eq!(
            "error-notification".parse::<NotificationCategory>().unwrap(),
            NotificationCategory::ErrorNotification
        );
        assert_eq!(NotificationCategory::ErrorNotification.to_string(), "error-notification");
        assert_eq!(
            serde_json::to_string(&NotificationCategory::ErrorNotification).unwrap(),
            "\"error-notification\""
        );
        assert!("fatal".parse::<Level>().is_err());
    }

    #[test]
    fn test_environment() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert!(Environment::Production.is_production());
        assert!(!Environment::default().is_production());
        assert!("staging".parse::<Environment>().is_err());
    }
}
