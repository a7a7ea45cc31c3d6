//! Notification dispatcher.
//!
//! Every outbound email or text message is stored as a notification row
//! before it is handed to a transport, so delivery state survives restarts
//! and can be inspected, retried and resent.
//!
//! - [`NotificationService`] - send, resend, retry and query notifications
//! - [`Transports`] - the optional email and SMS backends
//! - [`RetryPolicy`] / [`RetrySweeper`] - retry accounting and background re-attempts
//!
//! When a channel has no transport configured, delivery is simulated outside
//! production and fails in production.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, Environment};
//! use notifier::{EmailRequest, NotificationService, NotifierConfig, Transports};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect_in_memory().await?;
//! let service = NotificationService::new(
//!     db.pool().clone(),
//!     Transports::none(),
//!     NotifierConfig::new(Environment::Development),
//! );
//!
//! let ids = service
//!     .send_email(EmailRequest::new("ops@example.com", "Deploy finished", "All green."))
//!     .await?;
//! println!("queued {} notification(s)", ids.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod request;
pub mod retry;
pub mod service;

pub use config::NotifierConfig;
pub use error::{NotifierError, Result};
pub use request::{EmailRequest, Recipients, SmsRequest};
pub use retry::{FailureAction, RetryPolicy, RetrySweeper};
pub use service::{NotificationService, Transports};
