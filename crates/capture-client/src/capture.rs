//! The capture layer: installs listeners and forwards reports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::classify::{classify, enrich};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::host::{CaptureHost, ClientEnvironment, Listener};
use crate::queue::RetryQueue;
use crate::report::ErrorReport;
use crate::signal::{ClientSignal, SignalKind};
use crate::sink::{HttpSink, ReportSink};

struct Inner {
    sink: Arc<dyn ReportSink>,
    config: CaptureConfig,
    session_id: String,
    initialized: AtomicBool,
    queue: Mutex<RetryQueue>,
}

/// Client-side error capture.
///
/// Cheap to clone; clones share the session, the queue and the
/// initialization state.
#[derive(Clone)]
pub struct ClientCapture {
    inner: Arc<Inner>,
}

impl ClientCapture {
    pub fn new(config: CaptureConfig, sink: Arc<dyn ReportSink>) -> Self {
        let queue = RetryQueue::with_capacity(config.queue_capacity);
        Self {
            inner: Arc::new(Inner {
                sink,
                config,
                session_id: uuid::Uuid::new_v4().to_string(),
                initialized: AtomicBool::new(false),
                queue: Mutex::new(queue),
            }),
        }
    }

    /// Capture that posts to the configured ingest endpoint over HTTP.
    pub fn with_http(config: CaptureConfig) -> Result<Self, CaptureError> {
        let sink = HttpSink::new(config.ingest_url.clone())?;
        Ok(Self::new(config, Arc::new(sink)))
    }

    /// Identifier shared by every report from this capture instance.
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Install one listener per signal kind on `host` and start forwarding.
    ///
    /// Only the first call does anything; later calls return `false`. Must be
    /// called inside a tokio runtime.
    pub fn init(&self, host: Arc<dyn CaptureHost>) -> bool {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("Client capture already initialized");
            return false;
        }

        let (sender, mut receiver) = mpsc::unbounded_channel::<ClientSignal>();
        for kind in SignalKind::ALL {
            let sender = sender.clone();
            let listener: Listener = Arc::new(move |signal| {
                let _ = sender.send(signal);
            });
            host.register(kind, listener);
        }

        let capture = self.clone();
        tokio::spawn(async move {
            while let Some(signal) = receiver.recv().await {
                capture.handle_signal(host.as_ref(), signal).await;
            }
            debug!("Client capture forwarder stopped");
        });

        info!(session_id = %self.inner.session_id, "Client error capture initialized");
        true
    }

    async fn handle_signal(&self, host: &dyn CaptureHost, signal: ClientSignal) {
        let kind = signal.kind();
        match classify(signal, &self.inner.config.ingest_url) {
            Some(report) => {
                let report = enrich(report, &host.environment(), &self.inner.session_id);
                self.forward(report).await;
            }
            None => debug!(kind = ?kind, "Signal ignored"),
        }
    }

    /// Report an error explicitly, outside the installed listeners.
    pub async fn capture(&self, report: ErrorReport, environment: &ClientEnvironment) -> bool {
        let report = enrich(report, environment, &self.inner.session_id);
        self.forward(report).await
    }

    /// Send a report. On failure it is queued; on success the queue is flushed.
    async fn forward(&self, report: ErrorReport) -> bool {
        match self.inner.sink.send(&report).await {
            Ok(()) => {
                self.flush().await;
                true
            }
            Err(e) => {
                debug!(title = %report.title, "Report not delivered, queued for retry: {}", e);
                self.queue().push(report);
                false
            }
        }
    }

    /// Retry queued reports in order, stopping at the first failure.
    /// Returns how many were delivered.
    pub async fn flush(&self) -> usize {
        let mut delivered = 0;

        loop {
            let next = self.queue().pop();
            let Some(report) = next else {
                break;
            };
            match self.inner.sink.send(&report).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!("Flush stopped: {}", e);
                    self.queue().push_front(report);
                    break;
                }
            }
        }

        delivered
    }

    /// Number of reports waiting for a retry.
    pub fn queued(&self) -> usize {
        self.queue().len()
    }

    fn queue(&self) -> MutexGuard<'_, RetryQueue> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ClientCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCapture")
            .field("ingest_url", &self.inner.config.ingest_url)
            .field("session_id", &self.inner.session_id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportLevel;
    use crate::signal::ConsoleArg;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct MockHost {
        listeners: Mutex<HashMap<SignalKind, Vec<Listener>>>,
        registrations: AtomicUsize,
    }

    impl MockHost {
        fn emit(&self, signal: ClientSignal) {
            let listeners = self.listeners.lock().unwrap();
            for listener in listeners.get(&signal.kind()).into_iter().flatten() {
                listener(signal.clone());
            }
        }
    }

    impl CaptureHost for MockHost {
        fn register(&self, kind: SignalKind, listener: Listener) {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            self.listeners.lock().unwrap().entry(kind).or_default().push(listener);
        }

        fn environment(&self) -> ClientEnvironment {
            ClientEnvironment {
                url: Some("https://app.example.com/dashboard".to_string()),
                user_agent: Some("TestAgent/1.0".to_string()),
                viewport: Some((800, 600)),
                ..Default::default()
            }
        }
    }

    #[derive(Default)]
    struct MockSink {
        reports: Mutex<Vec<ErrorReport>>,
        failing: AtomicBool,
    }

    impl MockSink {
        fn reports(&self) -> Vec<ErrorReport> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportSink for MockSink {
        async fn send(&self, report: &ErrorReport) -> Result<(), CaptureError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(CaptureError::Unavailable("offline".to_string()));
            }
            self.reports.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn console(text: &str) -> ClientSignal {
        ClientSignal::Console {
            args: vec![ConsoleArg::text(text)],
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    fn setup() -> (ClientCapture, Arc<MockHost>, Arc<MockSink>) {
        let sink = Arc::new(MockSink::default());
        let capture = ClientCapture::new(CaptureConfig::default(), sink.clone());
        (capture, Arc::new(MockHost::default()), sink)
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let (capture, host, _sink) = setup();

        assert!(capture.init(host.clone()));
        assert!(!capture.init(host.clone()));
        assert!(!capture.clone().init(host.clone()));

        assert!(capture.is_initialized());
        assert_eq!(host.registrations.load(Ordering::SeqCst), SignalKind::ALL.len());
    }

    #[tokio::test]
    async fn test_signals_are_classified_enriched_and_forwarded() {
        let (capture, host, sink) = setup();
        capture.init(host.clone());

        host.emit(console("Something error-ish happened"));
        host.emit(console("Failed to log error: network"));
        host.emit(ClientSignal::UnhandledRejection {
            reason: "timeout".to_string(),
            stack: None,
        });

        wait_for(|| sink.reports().len() == 2).await;
        let reports = sink.reports();
        assert_eq!(reports[0].tags, vec!["console-error"]);
        assert_eq!(reports[1].tags, vec!["unhandled-promise"]);

        for report in &reports {
            assert_eq!(report.url.as_deref(), Some("https://app.example.com/dashboard"));
            assert_eq!(report.user_agent.as_deref(), Some("TestAgent/1.0"));
            assert_eq!(report.metadata["sessionId"], capture.session_id());
        }
    }

    #[tokio::test]
    async fn test_failed_reports_queue_and_flush_after_next_success() {
        let (capture, host, sink) = setup();
        capture.init(host.clone());

        sink.failing.store(true, Ordering::SeqCst);
        for n in 0..12 {
            host.emit(console(&format!("error {}", n)));
        }
        wait_for(|| capture.queued() == 10).await;
        // Give the forwarder time to process every signal.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(capture.queued(), 10);

        sink.failing.store(false, Ordering::SeqCst);
        host.emit(console("error 12"));

        wait_for(|| sink.reports().len() == 11).await;
        assert_eq!(capture.queued(), 0);

        let messages: Vec<_> = sink.reports().into_iter().map(|r| r.message).collect();
        assert_eq!(messages[0], "error 12");
        assert_eq!(messages[1], "error 2");
        assert_eq!(messages[10], "error 11");
    }

    #[tokio::test]
    async fn test_manual_capture_and_flush() {
        let (capture, _host, sink) = setup();

        sink.failing.store(true, Ordering::SeqCst);
        let report = ErrorReport::new("Checkout", "payment widget failed", ReportLevel::Warning);
        assert!(!capture.capture(report, &ClientEnvironment::default()).await);
        assert_eq!(capture.queued(), 1);
        assert_eq!(capture.flush().await, 0);

        sink.failing.store(false, Ordering::SeqCst);
        assert_eq!(capture.flush().await, 1);
        assert_eq!(sink.reports()[0].title, "Checkout");
    }

    #[test]
    fn test_session_ids_differ_between_instances() {
        let sink: Arc<dyn ReportSink> = Arc::new(MockSink::default());
        let a = ClientCapture::new(CaptureConfig::default(), sink.clone());
        let b = ClientCapture::new(CaptureConfig::default(), sink);

        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(a.session_id(), a.clone().session_id());
    }
}
