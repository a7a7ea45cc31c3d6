//! Recording transport - accepts every message and keeps a copy.

use std::sync::{Arc, Mutex};

use transport_core::{
    async_trait, EmailMessage, EmailTransport, SmsMessage, SmsTransport, TransportError, TransportReceipt,
};

/// A transport that accepts every message and records it.
///
/// Clones share the same record, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    emails: Arc<Mutex<Vec<EmailMessage>>>,
    sms: Arc<Mutex<Vec<SmsMessage>>>,
}

impl RecordingTransport {
    /// Create an empty recording transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails accepted so far.
    pub fn emails(&self) -> Vec<EmailMessage> {
        self.emails.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Text messages accepted so far.
    pub fn sms(&self) -> Vec<SmsMessage> {
        self.sms.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn receipt(kind: &str, sequence: usize) -> TransportReceipt {
        TransportReceipt::new(serde_json::json!({
            "transport": "recording",
            "kind": kind,
            "sequence": sequence,
        }))
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send_email(&self, message: &EmailMessage) -> Result<TransportReceipt, TransportError> {
        let mut emails = self
            .emails
            .lock()
            .map_err(|_| TransportError::Unavailable("recording lock poisoned".to_string()))?;
        emails.push(message.clone());
        Ok(Self::receipt("email", emails.len()))
    }

    fn name(&self) -> &str {
        "RecordingTransport"
    }
}

#[async_trait]
impl SmsTransport for RecordingTransport {
    async fn send_sms(&self, message: &SmsMessage) -> Result<TransportReceipt, TransportError> {
        let mut sms = self
            .sms
            .lock()
            .map_err(|_| TransportError::Unavailable("recording lock poisoned".to_string()))?;
        sms.push(message.clone());
        Ok(Self::receipt("sms", sms.len()))
    }

    fn name(&self) -> &str {
        "RecordingTransport"
    }
}
