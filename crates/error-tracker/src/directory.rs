//! Where admin alert recipients come from.

use async_trait::async_trait;
use database::{user, DatabaseError};
use sqlx::SqlitePool;

/// An admin who should receive error alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecipient {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Source of the admin roster.
///
/// This trait is object-safe and can be used with `Arc<dyn AdminDirectory>`.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Admins that have an email address on file.
    async fn admin_recipients(&self) -> Result<Vec<AdminRecipient>, DatabaseError>;
}

/// Reads admins from the `users` table.
#[derive(Debug, Clone)]
pub struct DatabaseDirectory {
    pool: SqlitePool,
}

impl DatabaseDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminDirectory for DatabaseDirectory {
    async fn admin_recipients(&self) -> Result<Vec<AdminRecipient>, DatabaseError> {
        let admins = user::list_admins_with_email(&self.pool).await?;
        Ok(admins
            .into_iter()
            .filter_map(|u| {
                u.email.map(|email| AdminRecipient {
                    id: u.id,
                    name: u.name,
                    email,
                })
            })
            .collect())
    }
}

/// A fixed roster.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    recipients: Vec<AdminRecipient>,
}

impl StaticDirectory {
    pub fn new(recipients: Vec<AdminRecipient>) -> Self {
        Self { recipients }
    }

    /// Build a roster from bare email addresses.
    pub fn from_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let recipients = emails
            .into_iter()
            .map(Into::into)
            .filter(|email: &String| !email.trim().is_empty())
            .map(|email| AdminRecipient {
                id: email.clone(),
                name: email.clone(),
                email,
            })
            .collect();
        Self { recipients }
    }
}

#[async_trait]
impl AdminDirectory for StaticDirectory {
    async fn admin_recipients(&self) -> Result<Vec<AdminRecipient>, DatabaseError> {
        Ok(self.recipients.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{Database, User, UserRole};

    #[tokio::test]
    async fn test_database_directory_lists_admins_with_email() {
        let db = Database::connect_in_memory().await.unwrap();
        for (id, email, role) in [
            ("1", Some("root@example.com"), UserRole::Admin),
            ("2", None, UserRole::Admin),
            ("3", Some("user@example.com"), UserRole::User),
        ] {
            user::create_user(
                db.pool(),
                &User {
                    id: id.to_string(),
                    name: format!("user {}", id),
                    email: email.map(str::to_string),
                    role,
                },
            )
            .await
            .unwrap();
        }

        let recipients = DatabaseDirectory::new(db.pool().clone())
            .admin_recipients()
            .await
            .unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].email, "root@example.com");
    }

    #[tokio::test]
    async fn test_static_directory_skips_blank() {
        let directory = StaticDirectory::from_emails(["a@example.com", " "]);
        let recipients = directory.admin_recipients().await.unwrap();
        assert_eq!(recipients.len(), 1);
    }
}
