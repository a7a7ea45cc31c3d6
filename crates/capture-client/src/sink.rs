//! Where reports are forwarded to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::CaptureError;
use crate::report::ErrorReport;

/// Destination for captured reports.
///
/// This trait is object-safe and can be used with `Arc<dyn ReportSink>`.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send(&self, report: &ErrorReport) -> Result<(), CaptureError>;
}

/// Posts reports as JSON to the server's ingest endpoint.
#[derive(Debug, Clone)]
pub struct HttpSink {
    http: Client,
    endpoint: String,
}

impl HttpSink {
    /// Create a sink posting to `endpoint` (the full ingest URL).
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CaptureError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(CaptureError::Http)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReportSink for HttpSink {
    async fn send(&self, report: &ErrorReport) -> Result<(), CaptureError> {
        debug!(title = %report.title, "Forwarding error report");

        let response = self.http.post(&self.endpoint).json(report).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::Status(status.as_u16()));
        }
        Ok(())
    }
}
