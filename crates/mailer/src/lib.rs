//! # mailer
//!
//! SMTP client used to deliver notification email.
//!
//! ## Sending Email
//!
//! ```no_run
//! use mailer::{SmtpConfig, SmtpMailer};
//! use transport_core::{EmailMessage, EmailTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SmtpConfig::from_env()?;
//!     let mailer = SmtpMailer::new(config)?;
//!
//!     let email = EmailMessage::new("admin@example.com", "Hello", "Plain text body");
//!     mailer.send_email(&email).await?;
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::SmtpMailer;
pub use config::{SmtpConfig, SmtpSecurity};
pub use error::MailerError;
