//! Mock transport implementations for notification delivery tests.
//!
//! This crate provides mock implementations of the transport traits:
//! - `RecordingTransport` - Accepts everything and remembers what it was given
//! - `FlakyTransport` - Fails a scripted number of times before succeeding
//! - `DelayedTransport` - Wraps another transport with artificial delay
//!
//! For real delivery, use the `mailer` and `sms-gateway` crates instead.
//!
//! # Example
//!
//! ```rust
//! use mock_transport::{EmailMessage, EmailTransport, RecordingTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_transport::TransportError> {
//!     let transport = RecordingTransport::new();
//!
//!     let message = EmailMessage::new("admin@example.com", "Alert", "Something broke");
//!     transport.send_email(&message).await?;
//!
//!     assert_eq!(transport.emails().len(), 1);
//!     Ok(())
//! }
//! ```

mod delayed;
mod flaky;
mod recording;

// Re-export transport-core types for convenience
pub use transport_core::{
    async_trait, EmailMessage, EmailTransport, SmsMessage, SmsTransport, TransportError, TransportReceipt,
};

pub use delayed::DelayedTransport;
pub use flaky::FlakyTransport;
pub use recording::RecordingTransport;
