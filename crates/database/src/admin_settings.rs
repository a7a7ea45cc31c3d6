//! Singleton admin settings controlling error notifications.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{AdminSettings, Level};
use crate::Result;

/// Load the settings row, creating it with defaults if it does not exist.
///
/// Defaults: notifications enabled, minimum level `error`.
pub async fn get_or_create_settings(pool: &SqlitePool) -> Result<AdminSettings> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO admin_settings (id, email_notifications_enabled, notification_level)
        VALUES (1, 1, 'error')
        "#,
    )
    .execute(pool)
    .await?;

    let settings = sqlx::query_as::<_, AdminSettings>(
        r#"
        SELECT email_notifications_enabled, notification_level, updated_by, updated_at
        FROM admin_settings
        WHERE id = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(settings)
}

/// Read the settings row without creating it.
pub async fn get_settings(pool: &SqlitePool) -> Result<Option<AdminSettings>> {
    let settings = sqlx::query_as::<_, AdminSettings>(
        r#"
        SELECT email_notifications_enabled, notification_level, updated_by, updated_at
        FROM admin_settings
        WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(settings)
}

/// Create or update the settings row.
pub async fn update_settings(
    pool: &SqlitePool,
    email_notifications_enabled: bool,
    notification_level: Level,
    updated_by: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AdminSettings> {
    let settings = sqlx::query_as::<_, AdminSettings>(
        r#"
        INSERT INTO admin_settings (id, email_notifications_enabled, notification_level, updated_by, updated_at)
        VALUES (1, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            email_notifications_enabled = excluded.email_notifications_enabled,
            notification_level = excluded.notification_level,
            updated_by = excluded.updated_by,
            updated_at = excluded.updated_at
        RETURNING email_notifications_enabled, notification_level, updated_by, updated_at
        "#,
    )
    .bind(email_notifications_enabled)
    .bind(notification_level)
    .bind(updated_by)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_defaults_created_lazily() {
        let db = test_db().await;
        assert!(get_settings(db.pool()).await.unwrap().is_none());

        let settings = get_or_create_settings(db.pool()).await.unwrap();
        assert!(settings.email_notifications_enabled);
        assert_eq!(settings.notification_level, Level::Error);

        // Second call reuses the same row.
        get_or_create_settings(db.pool()).await.unwrap();
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_settings")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_update_settings() {
        let db = test_db().await;
        get_or_create_settings(db.pool()).await.unwrap();

        let updated = update_settings(db.pool(), false, Level::Warning, Some("admin-1"), Utc::now())
            .await
            .unwrap();
        assert!(!updated.email_notifications_enabled);
        assert_eq!(updated.notification_level, Level::Warning);
        assert_eq!(updated.updated_by.as_deref(), Some("admin-1"));

        let reloaded = get_or_create_settings(db.pool()).await.unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn test_second_settings_row_rejected() {
        let db = test_db().await;
        let result = sqlx::query("INSERT INTO admin_settings (id) VALUES (2)")
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }
}
