//! Flaky transport - fails a scripted number of attempts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use transport_core::{
    async_trait, EmailMessage, EmailTransport, SmsMessage, SmsTransport, TransportError, TransportReceipt,
};

use crate::RecordingTransport;

/// A transport that fails the first `failures` attempts, then delegates to a
/// [`RecordingTransport`].
///
/// Useful for exercising retry accounting.
#[derive(Debug, Clone)]
pub struct FlakyTransport {
    remaining_failures: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
    inner: RecordingTransport,
    reason: String,
}

impl FlakyTransport {
    /// Fail the next `failures` attempts.
    pub fn failing(failures: usize) -> Self {
        Self {
            remaining_failures: Arc::new(AtomicUsize::new(failures)),
            attempts: Arc::new(AtomicUsize::new(0)),
            inner: RecordingTransport::new(),
            reason: "connection refused".to_string(),
        }
    }

    /// Fail every attempt.
    pub fn always_failing() -> Self {
        Self::failing(usize::MAX)
    }

    /// Use a custom failure reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Make the next `failures` attempts fail again.
    pub fn fail_next(&self, failures: usize) {
        self.remaining_failures.store(failures, Ordering::SeqCst);
    }

    /// Number of attempts made, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Messages that got through.
    pub fn delivered(&self) -> &RecordingTransport {
        &self.inner
    }

    fn should_fail(&self) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EmailTransport for FlakyTransport {
    async fn send_email(&self, message: &EmailMessage) -> Result<TransportReceipt, TransportError> {
        if self.should_fail() {
            return Err(TransportError::Unavailable(self.reason.clone()));
        }
        self.inner.send_email(message).await
    }

    fn name(&self) -> &str {
        "FlakyTransport"
    }
}

#[async_trait]
impl SmsTransport for FlakyTransport {
    async fn send_sms(&self, message: &SmsMessage) -> Result<TransportReceipt, TransportError> {
        if self.should_fail() {
            return Err(TransportError::Unavailable(self.reason.clone()));
        }
        self.inner.send_sms(message).await
    }

    fn name(&self) -> &str {
        "FlakyTransport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fails_then_succeeds() {
        let transport = FlakyTransport::failing(2);
        let message = EmailMessage::new("a@x.com", "Hi", "Body");

        assert!(transport.send_email(&message).await.is_err());
        assert!(transport.send_email(&message).await.is_err());
        assert!(transport.send_email(&message).await.is_ok());

        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.delivered().emails().len(), 1);
    }

    #[tokio::test]
    async fn test_always_failing_reason() {
        let transport = FlakyTransport::always_failing().with_reason("mailbox full");
        let err = transport
            .send_sms(&SmsMessage::new("+15551234567", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "transport unavailable: mailbox full");
    }

    #[tokio::test]
    async fn test_fail_next_rearms() {
        let transport = FlakyTransport::failing(0);
        let message = EmailMessage::new("a@x.com", "Hi", "Body");

        assert!(transport.send_email(&message).await.is_ok());
        transport.fail_next(1);
        assert!(transport.send_email(&message).await.is_err());
        assert!(transport.send_email(&message).await.is_ok());
    }
}
