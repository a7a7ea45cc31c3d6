//! Delayed transport - wraps another transport with artificial delay.

use std::time::Duration;

use tokio::time::sleep;
use transport_core::{
    async_trait, EmailMessage, EmailTransport, SmsMessage, SmsTransport, TransportError, TransportReceipt,
};

/// A transport that waits before delegating to another transport.
///
/// Useful for checking that slow delivery does not hold up issue logging.
pub struct DelayedTransport<T> {
    inner: T,
    delay: Duration,
}

impl<T> DelayedTransport<T> {
    /// Wrap `inner` with the given delay.
    pub fn new(inner: T, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Wrap `inner` with a delay in milliseconds.
    pub fn with_millis(inner: T, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }
}

#[async_trait]
impl<T: EmailTransport> EmailTransport for DelayedTransport<T> {
    async fn send_email(&self, message: &EmailMessage) -> Result<TransportReceipt, TransportError> {
        sleep(self.delay).await;
        self.inner.send_email(message).await
    }

    fn name(&self) -> &str {
        "DelayedTransport"
    }
}

#[async_trait]
impl<T: SmsTransport> SmsTransport for DelayedTransport<T> {
    async fn send_sms(&self, message: &SmsMessage) -> Result<TransportReceipt, TransportError> {
        sleep(self.delay).await;
        self.inner.send_sms(message).await
    }

    fn name(&self) -> &str {
        "DelayedTransport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingTransport;
    use std::time::Instant;

    #[tokio::test]
    async fn test_delayed_transport() {
        let transport = DelayedTransport::with_millis(RecordingTransport::new(), 50);
        let message = EmailMessage::new("a@x.com", "Hi", "Body");

        let start = Instant::now();
        transport.send_email(&message).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
