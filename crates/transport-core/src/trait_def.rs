//! Transport trait definitions.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::{EmailMessage, SmsMessage, TransportReceipt};

/// A backend that can deliver email.
///
/// This trait is object-safe and can be used with `Arc<dyn EmailTransport>`.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Hand one email to the backend.
    ///
    /// # Returns
    ///
    /// The provider's receipt, or an error if the attempt failed. Failures are
    /// treated as transient by the dispatcher and count against the retry budget.
    async fn send_email(&self, message: &EmailMessage) -> Result<TransportReceipt, TransportError>;

    /// Get a human-readable name for this transport.
    fn name(&self) -> &str;
}

/// A backend that can deliver text messages.
///
/// This trait is object-safe and can be used with `Arc<dyn SmsTransport>`.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Hand one text message to the backend.
    async fn send_sms(&self, message: &SmsMessage) -> Result<TransportReceipt, TransportError>;

    /// Get a human-readable name for this transport.
    fn name(&self) -> &str;
}
