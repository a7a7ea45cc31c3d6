//! Error tracking with fingerprint deduplication and admin alerts.
//!
//! Occurrences are grouped into issues by a stable fingerprint. Repeat
//! occurrences bump the issue's count, escalate its level and merge context;
//! the first occurrence of a fingerprint is handed to the notification policy,
//! which alerts admins by email when the issue is severe enough.
//!
//! # Architecture
//!
//! ```text
//! ServerCapture / panic hook / ingest endpoint
//!          ↓
//!   ErrorTracker::log ── fingerprint ──► issues table (atomic upsert)
//!          ↓ new issue only
//!   bounded hand-off channel
//!          ↓
//!   NotificationWorker ──► NotificationPolicy ──► NotificationService
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use database::{Database, Environment};
//! use error_tracker::{
//!     DatabaseDirectory, ErrorPipeline, LogOptions, NotificationPolicy, TrackerConfig,
//! };
//! use notifier::{NotificationService, NotifierConfig, Transports};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect_in_memory().await?;
//! let notifier = NotificationService::new(
//!     db.pool().clone(),
//!     Transports::none(),
//!     NotifierConfig::new(Environment::Development),
//! );
//! let policy = NotificationPolicy::new(
//!     db.pool().clone(),
//!     Arc::new(DatabaseDirectory::new(db.pool().clone())),
//!     notifier,
//!     "Starter",
//! );
//!
//! let pipeline = ErrorPipeline::start(db.pool().clone(), TrackerConfig::default(), policy);
//! let tracker = pipeline.tracker().clone();
//!
//! tracker
//!     .log_error("TypeError", "x is undefined", LogOptions::new().tag("checkout"))
//!     .await;
//!
//! pipeline.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod fingerprint;
pub mod options;
pub mod policy;
pub mod process_hooks;
pub mod server_capture;
pub mod tracker;
pub mod worker;

pub use config::TrackerConfig;
pub use directory::{AdminDirectory, AdminRecipient, DatabaseDirectory, StaticDirectory};
pub use error::TrackerConfigError;
pub use fingerprint::fingerprint;
pub use options::LogOptions;
pub use policy::{priority_for, render_alert, should_notify, Alert, NotificationPolicy, PolicyOutcome};
pub use process_hooks::{install_panic_hook, panic_hook_installed, spawn_monitored, PanicHookOptions};
pub use server_capture::{ActionContext, ServerCapture};
pub use tracker::ErrorTracker;
pub use worker::ErrorPipeline;
