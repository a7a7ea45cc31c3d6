//! SQLite persistence for the error tracker.
//!
//! This crate stores deduplicated issues, outbound notification records, the
//! singleton admin settings row and the admin roster, using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use database::{issue, Database, Level, NewOccurrence};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:tracker.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Record an occurrence
//!     let occurrence = NewOccurrence {
//!         fingerprint: "3f2a9c1d7e5b4a60".to_string(),
//!         title: "TypeError".to_string(),
//!         message: "x is undefined".to_string(),
//!         stack: None,
//!         level: Level::Error,
//!         url: None,
//!         user_agent: None,
//!         user_id: None,
//!         environment: "development".to_string(),
//!         tags: vec![],
//!         metadata: Default::default(),
//!         seen_at: Utc::now(),
//!     };
//!     let recorded = issue::record_occurrence(db.pool(), &occurrence).await?;
//!     println!("issue {} seen {} times", recorded.issue.id, recorded.issue.count);
//!
//!     Ok(())
//! }
//! ```

pub mod admin_settings;
pub mod error;
pub mod issue;
pub mod models;
pub mod notification;
pub mod page;
pub mod user;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use issue::{IssueFilter, IssueStats, Occurrence};
pub use models::{
    AdminSettings, Environment, Issue, IssueStatus, Level, Metadata, NewNotification, NewOccurrence,
    Notification, NotificationCategory, NotificationStatus, NotificationType, Priority,
    UnknownVariant, User, UserRole,
};
pub use notification::{NotificationFilter, NotificationStats};
pub use page::{Page, PageRequest};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// let db = database::Database::connect("sqlite:data/tracker.db?mode=rwc").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Open a private in-memory database with the schema applied.
    ///
    /// Uses a single connection so every query sees the same database.
    pub async fn connect_in_memory() -> Result<Self> {
        let db = Self::connect_with_pool_size("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
