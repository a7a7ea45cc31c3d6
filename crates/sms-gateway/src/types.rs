//! Request and response types for the gateway's `send` method.

use serde::{Deserialize, Serialize};

/// Parameters for sending a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    /// Recipients (phone numbers).
    pub recipient: Vec<String>,

    /// The message text.
    pub message: String,

    /// Sender number (multi-sender gateways).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

impl SendParams {
    /// Create new send params for a text message to a recipient.
    pub fn text(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient: vec![recipient.into()],
            message: message.into(),
            sender: None,
        }
    }

    /// Set the sender number.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    /// Gateway-assigned message identifier.
    pub message_id: String,
    /// Gateway timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}
