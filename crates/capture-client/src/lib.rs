//! Client-side error capture.
//!
//! Runs inside a client runtime (browser bridge, webview, native shell). The
//! host delivers raw failure signals through [`CaptureHost`]; this crate
//! classifies them, enriches them with page and session context and posts
//! them to the server's `POST /api/errors` endpoint.
//!
//! Reports that cannot be delivered wait in a small bounded queue and are
//! retried after the next successful delivery or on [`ClientCapture::flush`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use capture_client::{CaptureConfig, CaptureHost, ClientCapture};
//!
//! # fn example(host: Arc<dyn CaptureHost>) -> Result<(), capture_client::CaptureError> {
//! let capture = ClientCapture::with_http(CaptureConfig::new("https://app.example.com"))?;
//! capture.init(host);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod classify;
pub mod config;
pub mod error;
pub mod host;
pub mod queue;
pub mod report;
pub mod signal;
pub mod sink;

pub use capture::ClientCapture;
pub use classify::{classify, enrich};
pub use config::CaptureConfig;
pub use error::CaptureError;
pub use host::{CaptureHost, ClientEnvironment, Listener, MemorySnapshot, NavigationTiming};
pub use queue::RetryQueue;
pub use report::{ErrorReport, ReportLevel};
pub use signal::{ClientSignal, ConsoleArg, RequestFailure, SignalKind};
pub use sink::{HttpSink, ReportSink};
