//! Core traits and types for outbound notification transports.
//!
//! This crate provides the shared interface between the notification
//! dispatcher and the concrete delivery backends. It defines:
//!
//! - [`EmailTransport`] / [`SmsTransport`] - The traits every backend implements
//! - [`EmailMessage`] / [`SmsMessage`] - What gets handed to a backend
//! - [`TransportReceipt`] - The provider's answer, kept for diagnostics
//! - [`TransportError`] - Error types for delivery attempts
//!
//! # Example
//!
//! ```rust
//! use transport_core::{async_trait, EmailMessage, EmailTransport, TransportError, TransportReceipt};
//!
//! struct StdoutTransport;
//!
//! #[async_trait]
//! impl EmailTransport for StdoutTransport {
//!     async fn send_email(&self, message: &EmailMessage) -> Result<TransportReceipt, TransportError> {
//!         println!("to {}: {}", message.to, message.subject);
//!         Ok(TransportReceipt::new(serde_json::json!({"printed": true})))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "stdout"
//!     }
//! }
//! ```

mod error;
mod message;
mod trait_def;

pub use error::TransportError;
pub use message::{EmailMessage, SmsMessage, TransportReceipt};
pub use trait_def::{EmailTransport, SmsTransport};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
