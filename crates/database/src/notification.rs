//! Notification delivery records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{
    NewNotification, Notification, NotificationCategory, NotificationStatus, NotificationType,
};
use crate::page::{like_pattern, Page, PageRequest};

macro_rules! notification_columns {
    () => {
        "id, notification_type, recipient, subject, content, html_content, template_id, \
         template_data, category, priority, status, retry_count, max_retries, scheduled_for, \
         sent_at, failure_reason, provider_response, user_id, sent_by, created_at, updated_at"
    };
}

/// Filters for [`list_notifications`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFilter {
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub status: Option<NotificationStatus>,
    pub category: Option<NotificationCategory>,
    pub user_id: Option<String>,
    /// Substring matched against recipient, subject and content.
    pub search: Option<String>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
}

fn not_found(id: &str) -> DatabaseError {
    DatabaseError::NotFound {
        entity: "Notification",
        id: id.to_string(),
    }
}

/// Insert a pending notification and return the stored row.
pub async fn create_notification(
    pool: &SqlitePool,
    notification: &NewNotification,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let id = uuid::Uuid::new_v4().to_string();

    let created = sqlx::query_as::<_, Notification>(concat!(
        r#"
        INSERT INTO notifications (
            id, notification_type, recipient, subject, content, html_content,
            template_id, template_data, category, priority, status, retry_count,
            max_retries, scheduled_for, user_id, sent_by, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?, ?, ?, ?, ?)
        RETURNING "#,
        notification_columns!()
    ))
    .bind(&id)
    .bind(notification.notification_type)
    .bind(&notification.recipient)
    .bind(&notification.subject)
    .bind(&notification.content)
    .bind(&notification.html_content)
    .bind(&notification.template_id)
    .bind(notification.template_data.as_ref().map(Json))
    .bind(notification.category)
    .bind(notification.priority)
    .bind(notification.max_retries.max(0))
    .bind(notification.scheduled_for)
    .bind(&notification.user_id)
    .bind(&notification.sent_by)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

/// Get a notification by ID.
pub async fn get_notification(pool: &SqlitePool, id: &str) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(concat!(
        "SELECT ",
        notification_columns!(),
        " FROM notifications WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Record a successful hand-off to the transport.
pub async fn mark_sent(
    pool: &SqlitePool,
    id: &str,
    provider_response: &serde_json::Value,
    now: DateTime<Utc>,
) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(concat!(
        r#"
        UPDATE notifications
        SET status = 'sent', sent_at = ?, provider_response = ?,
            failure_reason = NULL, updated_at = ?
        WHERE id = ?
        RETURNING "#,
        notification_columns!()
    ))
    .bind(now)
    .bind(Json(provider_response))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Record a transient failure; the notification stays pending.
pub async fn mark_retrying(
    pool: &SqlitePool,
    id: &str,
    retry_count: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(concat!(
        r#"
        UPDATE notifications
        SET status = 'pending', retry_count = ?, failure_reason = ?, updated_at = ?
        WHERE id = ?
        RETURNING "#,
        notification_columns!()
    ))
    .bind(retry_count)
    .bind(reason)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Record a terminal failure.
pub async fn mark_failed(
    pool: &SqlitePool,
    id: &str,
    retry_count: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(concat!(
        r#"
        UPDATE notifications
        SET status = 'failed', retry_count = ?, failure_reason = ?, updated_at = ?
        WHERE id = ?
        RETURNING "#,
        notification_columns!()
    ))
    .bind(retry_count)
    .bind(reason)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Record provider confirmation of delivery.
pub async fn mark_delivered(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(concat!(
        r#"
        UPDATE notifications
        SET status = 'delivered', sent_at = COALESCE(sent_at, ?), updated_at = ?
        WHERE id = ?
        RETURNING "#,
        notification_columns!()
    ))
    .bind(now)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Record a provider bounce.
pub async fn mark_bounced(
    pool: &SqlitePool,
    id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(concat!(
        r#"
        UPDATE notifications
        SET status = 'bounced', failure_reason = ?, updated_at = ?
        WHERE id = ?
        RETURNING "#,
        notification_columns!()
    ))
    .bind(reason)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Reset a notification so it can be delivered again.
pub async fn reset_for_resend(
    pool: &SqlitePool,
    id: &str,
    sent_by: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(concat!(
        r#"
        UPDATE notifications
        SET status = 'pending', retry_count = 0, failure_reason = NULL, sent_at = NULL,
            sent_by = COALESCE(?, sent_by), updated_at = ?
        WHERE id = ?
        RETURNING "#,
        notification_columns!()
    ))
    .bind(sent_by)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Pending notifications that are due: scheduled ones whose time has come and
/// ones waiting on a retry.
pub async fn list_due(pool: &SqlitePool, now: DateTime<Utc>, limit: u32) -> Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(concat!(
        "SELECT ",
        notification_columns!(),
        r#"
        FROM notifications
        WHERE status = 'pending'
          AND (scheduled_for IS NULL OR scheduled_for <= ?)
        ORDER BY created_at
        LIMIT ?
        "#
    ))
    .bind(now)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &NotificationFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(kind) = filter.notification_type {
        builder.push(" AND notification_type = ").push_bind(kind);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(user_id) = &filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        builder
            .push(" AND (recipient LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR subject LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR content LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// List notifications matching a filter, newest first.
pub async fn list_notifications(
    pool: &SqlitePool,
    filter: &NotificationFilter,
    page: PageRequest,
) -> Result<Page<Notification>> {
    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM notifications");
    push_filters(&mut count_query, filter);
    let total = count_query.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Sqlite>::new(concat!(
        "SELECT ",
        notification_columns!(),
        " FROM notifications"
    ));
    push_filters(&mut query, filter);
    query
        .push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());

    let items = query.build_query_as::<Notification>().fetch_all(pool).await?;

    Ok(Page {
        items,
        total,
        page: page.page.max(1),
        limit: page.limit(),
    })
}

/// Count notifications by status, type and category.
pub async fn notification_stats(pool: &SqlitePool) -> Result<NotificationStats> {
    let rows = sqlx::query_as::<_, (NotificationStatus, NotificationType, NotificationCategory, i64)>(
        r#"
        SELECT status, notification_type, category, COUNT(*) as count
        FROM notifications
        GROUP BY status, notification_type, category
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut stats = NotificationStats {
        by_status: NotificationStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect(),
        by_type: NotificationType::ALL.iter().map(|t| (t.to_string(), 0)).collect(),
        by_category: NotificationCategory::ALL.iter().map(|c| (c.to_string(), 0)).collect(),
        ..Default::default()
    };

    for (status, kind, category, count) in rows {
        stats.total += count;
        *stats.by_status.entry(status.to_string()).or_default() += count;
        *stats.by_type.entry(kind.to_string()).or_default() += count;
        *stats.by_category.entry(category.to_string()).or_default() += count;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::test_support::test_db;
    use chrono::Duration;

    fn email(recipient: &str) -> NewNotification {
        NewNotification {
            notification_type: NotificationType::Email,
            recipient: recipient.to_string(),
            subject: Some("Disk almost full".to_string()),
            content: "Volume /data is at 95%".to_string(),
            html_content: None,
            template_id: None,
            template_data: None,
            category: NotificationCategory::System,
            priority: Priority::High,
            max_retries: 3,
            scheduled_for: None,
            user_id: None,
            sent_by: None,
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let db = test_db().await;
        let created = create_notification(db.pool(), &email("a@x.com"), Utc::now())
            .await
            .unwrap();

        assert_eq!(created.status, NotificationStatus::Pending);
        assert_eq!(created.retry_count, 0);
        assert_eq!(created.max_retries, 3);
        assert!(created.sent_at.is_none());

        let fetched = get_notification(db.pool(), &created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = test_db().await;
        let created = create_notification(db.pool(), &email("a@x.com"), Utc::now())
            .await
            .unwrap();

        let retrying = mark_retrying(db.pool(), &created.id, 1, "connection reset", Utc::now())
            .await
            .unwrap();
        assert_eq!(retrying.status, NotificationStatus::Pending);
        assert_eq!(retrying.retry_count, 1);

        let failed = mark_failed(db.pool(), &created.id, 3, "connection reset", Utc::now())
            .await
            .unwrap();
        assert_eq!(failed.status, NotificationStatus::Failed);
        assert!(failed.can_resend());

        let reset = reset_for_resend(db.pool(), &created.id, Some("admin-1"), Utc::now())
            .await
            .unwrap();
        assert_eq!(reset.status, NotificationStatus::Pending);
        assert_eq!(reset.retry_count, 0);
        assert!(reset.failure_reason.is_none());
        assert_eq!(reset.sent_by.as_deref(), Some("admin-1"));

        let sent = mark_sent(
            db.pool(),
            &created.id,
            &serde_json::json!({"messageId": "abc"}),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert!(sent.sent_at.is_some());
        assert_eq!(sent.provider_response.unwrap().0["messageId"], "abc");
    }

    #[tokio::test]
    async fn test_retry_count_cannot_exceed_max() {
        let db = test_db().await;
        let created = create_notification(db.pool(), &email("a@x.com"), Utc::now())
            .await
            .unwrap();

        let result = mark_retrying(db.pool(), &created.id, 4, "boom", Utc::now()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_due_skips_future_schedules() {
        let db = test_db().await;
        let now = Utc::now();

        let mut later = email("later@x.com");
        later.scheduled_for = Some(now + Duration::hours(1));
        create_notification(db.pool(), &later, now).await.unwrap();
        let due = create_notification(db.pool(), &email("now@x.com"), now).await.unwrap();

        let rows = list_due(db.pool(), now, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, due.id);

        let rows = list_due(db.pool(), now + Duration::hours(2), 10).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_stats() {
        let db = test_db().await;
        let now = Utc::now();

        let first = create_notification(db.pool(), &email("alice@x.com"), now).await.unwrap();
        let mut sms = email("+15551234567");
        sms.notification_type = NotificationType::Sms;
        sms.subject = None;
        sms.category = NotificationCategory::Security;
        create_notification(db.pool(), &sms, now + Duration::seconds(1))
            .await
            .unwrap();
        mark_sent(db.pool(), &first.id, &serde_json::json!({}), now).await.unwrap();

        let page = list_notifications(db.pool(), &NotificationFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].recipient, "+15551234567");

        let emails = list_notifications(
            db.pool(),
            &NotificationFilter {
                notification_type: Some(NotificationType::Email),
                search: Some("alice".to_string()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
        assert_eq!(emails.total, 1);

        let stats = notification_stats(db.pool()).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status["sent"], 1);
        assert_eq!(stats.by_status["pending"], 1);
        assert_eq!(stats.by_type["sms"], 1);
        assert_eq!(stats.by_category["security"], 1);
        assert_eq!(stats.by_category["auth"], 0);
    }

    #[tokio::test]
    async fn test_search_treats_percent_literally() {
        let db = test_db().await;

        let full = create_notification(db.pool(), &email("ops@example.com"), Utc::now())
            .await
            .unwrap();
        let mut other = email("dev@example.com");
        other.subject = Some("Disk report".to_string());
        other.content = "Volume /data holds 950 GB".to_string();
        create_notification(db.pool(), &other, Utc::now()).await.unwrap();

        let found = list_notifications(
            db.pool(),
            &NotificationFilter {
                search: Some("95%".to_string()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].id, full.id);
    }
}
