//! SMS gateway client library.
//!
//! This crate provides a Rust client for an SMS gateway that speaks JSON-RPC
//! over HTTP. It supports:
//!
//! - Sending text messages to phone numbers
//! - Health checking and connection monitoring
//!
//! The client implements [`transport_core::SmsTransport`] so it can be handed
//! straight to the notification dispatcher.
//!
//! # Example
//!
//! ```no_run
//! use sms_gateway::{GatewayConfig, SmsClient};
//!
//! # async fn example() -> Result<(), sms_gateway::GatewayError> {
//! let config = GatewayConfig::with_sender("http://localhost:8080", "+15550001111");
//! let client = SmsClient::connect(config).await?;
//!
//! let result = client.send_text("+1234567890", "Hello!").await?;
//! println!("Accepted with id: {}", result.message_id);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::SmsClient;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use types::{SendParams, SendResult};
