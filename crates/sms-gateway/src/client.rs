//! SMS gateway HTTP client.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use transport_core::{async_trait, SmsMessage, SmsTransport, TransportError, TransportReceipt};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::types::{SendParams, SendResult};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Client for communicating with the SMS gateway.
#[derive(Clone)]
pub struct SmsClient {
    http: Client,
    config: GatewayConfig,
    request_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
}

impl SmsClient {
    /// Build a client without contacting the gateway.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self {
            http,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Connect to the gateway, verifying it with a health check.
    pub async fn connect(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Self::new(config)?;

        if client.health_check().await? {
            info!("Connected to SMS gateway at {}", client.config.base_url);
        } else {
            return Err(GatewayError::HealthCheckFailed);
        }

        Ok(client)
    }

    /// Check if the last health check succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Perform a health check against the gateway.
    pub async fn health_check(&self) -> Result<bool, GatewayError> {
        let url = self.config.check_url();
        debug!("Health check: {}", url);

        match self.http.get(&url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                self.connected.store(ok, Ordering::SeqCst);
                Ok(ok)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(GatewayError::Http(e))
            }
        }
    }

    /// Send a message using the full SendParams structure.
    pub async fn send(&self, mut params: SendParams) -> Result<SendResult, GatewayError> {
        if params.sender.is_none() {
            params.sender = self.config.sender.clone();
        }

        self.rpc_call("send", Some(params)).await
    }

    /// Send a text message to a recipient.
    pub async fn send_text(&self, recipient: &str, message: &str) -> Result<SendResult, GatewayError> {
        self.send(SendParams::text(recipient, message)).await
    }

    /// Start a background health monitor that periodically checks the gateway.
    pub fn start_health_monitor(&self, interval: Duration) -> JoinHandle<()> {
        let client = self.clone();

        tokio::spawn(async move {
            let mut consecutive_failures = 0u32;

            loop {
                tokio::time::sleep(interval).await;

                match client.health_check().await {
                    Ok(true) => {
                        if consecutive_failures > 0 {
                            info!("SMS gateway connection restored");
                        }
                        consecutive_failures = 0;
                    }
                    Ok(false) => {
                        consecutive_failures += 1;
                        warn!(
                            "Health check returned not OK (failures: {})",
                            consecutive_failures
                        );
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(
                            "Health check failed: {} (failures: {})",
                            e, consecutive_failures
                        );
                    }
                }
            }
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Make a JSON-RPC call to the gateway.
    async fn rpc_call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, GatewayError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let url = self.config.rpc_url();

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!("RPC call: {} (id={})", method, id);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(GatewayError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Connection(format!("HTTP {}: {}", status, body)));
        }

        let rpc_response: RpcResponse<R> = response.json().await.map_err(GatewayError::Http)?;
        parse_rpc_response(rpc_response)
    }
}

fn parse_rpc_response<R>(response: RpcResponse<R>) -> Result<R, GatewayError> {
    if let Some(error) = response.error {
        return Err(GatewayError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    response.result.ok_or_else(|| GatewayError::Rpc {
        code: -1,
        message: "No result in response".to_string(),
    })
}

#[async_trait]
impl SmsTransport for SmsClient {
    async fn send_sms(&self, message: &SmsMessage) -> Result<TransportReceipt, TransportError> {
        let result = self.send_text(&message.to, &message.text).await?;
        let response = serde_json::to_value(&result)
            .map_err(|e| TransportError::Rejected(format!("unreadable gateway response: {}", e)))?;
        Ok(TransportReceipt::new(response))
    }

    fn name(&self) -> &str {
        "sms-gateway"
    }
}

impl std::fmt::Debug for SmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsClient")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_response() {
        let response: RpcResponse<SendResult> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"bad number"},"id":1}"#)
                .unwrap();
        let err = parse_rpc_response(response).unwrap_err();
        assert!(matches!(err, GatewayError::Rpc { code: -32602, .. }));
    }

    #[test]
    fn test_rpc_success_response() {
        let response: RpcResponse<SendResult> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","result":{"messageId":"m-9","timestamp":5},"id":1}"#,
        )
        .unwrap();
        let result = parse_rpc_response(response).unwrap();
        assert_eq!(result.message_id, "m-9");
    }

    #[test]
    fn test_rpc_missing_result() {
        let response: RpcResponse<SendResult> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(parse_rpc_response(response).is_err());
    }

    #[test]
    fn test_rpc_error_maps_to_rejected() {
        let err: TransportError = GatewayError::Rpc {
            code: 400,
            message: "blocked".to_string(),
        }
        .into();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_new_client_starts_disconnected() {
        let client = SmsClient::new(GatewayConfig::default()).unwrap();
        assert!(!client.is_connected());
        assert_eq!(SmsTransport::name(&client), "sms-gateway");
    }
}
