//! Configuration types for sms-gateway.

use std::env;

use crate::GatewayError;

/// Configuration for connecting to the SMS gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway HTTP server (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Sender number for multi-sender gateways.
    /// If None, the gateway's default sender is used.
    pub sender: Option<String>,
}

impl GatewayConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sender: None,
        }
    }

    /// Create configuration with a specific sender number.
    pub fn with_sender(base_url: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            ..Self::new(base_url)
        }
    }

    /// Create configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `SMS_GATEWAY_URL` | Gateway base URL | (required) |
    /// | `SMS_SENDER` | Sender number | gateway default |
    pub fn from_env() -> Result<Self, GatewayError> {
        let base_url = env::var("SMS_GATEWAY_URL")
            .map_err(|_| GatewayError::Config("SMS_GATEWAY_URL not set".to_string()))?;

        Ok(match env::var("SMS_SENDER") {
            Ok(sender) => Self::with_sender(base_url, sender),
            Err(_) => Self::new(base_url),
        })
    }

    /// Whether a gateway is configured in the environment at all.
    pub fn is_configured_in_env() -> bool {
        env::var("SMS_GATEWAY_URL").is_ok()
    }

    /// Get the RPC endpoint URL.
    pub fn rpc_url(&self) -> String {
        format!("{}/api/v1/rpc", self.base_url)
    }

    /// Get the health check endpoint URL.
    pub fn check_url(&self) -> String {
        format!("{}/api/v1/check", self.base_url)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
