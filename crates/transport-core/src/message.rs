//! Message types handed to transports.

use serde::{Deserialize, Serialize};

/// An email addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub text: String,
    /// Optional HTML body.
    pub html: Option<String>,
}

impl EmailMessage {
    /// Create a plain text email.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            text: text.into(),
            html: None,
        }
    }

    /// Attach an HTML alternative.
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }
}

/// A text message addressed to a single phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    /// Recipient phone number.
    pub to: String,
    /// Message text.
    pub text: String,
}

impl SmsMessage {
    /// Create a text message.
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
        }
    }
}

/// What a transport reported after accepting a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportReceipt {
    /// Raw provider response, stored for diagnostics.
    pub provider_response: serde_json::Value,
}

impl TransportReceipt {
    /// Wrap a provider response.
    pub fn new(provider_response: serde_json::Value) -> Self {
        Self { provider_response }
    }
}
