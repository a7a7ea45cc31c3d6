//! Process-level failure hooks: panics and failed background tasks.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::options::LogOptions;
use crate::tracker::ErrorTracker;

static PANIC_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// How the panic hook behaves.
#[derive(Debug, Clone, Copy)]
pub struct PanicHookOptions {
    /// Upper bound on waiting for the panic to be stored.
    pub log_timeout: Duration,
    /// Terminate the process with status 1 after logging.
    pub exit_process: bool,
}

impl PanicHookOptions {
    pub fn from_tracker(tracker: &ErrorTracker) -> Self {
        Self {
            log_timeout: tracker.config().panic_log_timeout,
            exit_process: true,
        }
    }
}

/// Whether the panic hook has been installed in this process.
pub fn panic_hook_installed() -> bool {
    PANIC_HOOK_INSTALLED.load(Ordering::SeqCst)
}

/// Install a panic hook that logs every panic as a critical issue.
///
/// Logging is best effort and bounded by `log_timeout`. The previously
/// installed hook still runs afterwards. Only the first call in a process
/// installs anything; later calls return `false`.
pub fn install_panic_hook(tracker: ErrorTracker, runtime: Handle, options: PanicHookOptions) -> bool {
    if PANIC_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        debug!("Panic hook already installed");
        return false;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        let thread = std::thread::current().name().unwrap_or("unnamed").to_string();
        let backtrace = std::backtrace::Backtrace::force_capture().to_string();

        error!(target: "panic", message = %message, location = ?location, "panic occurred");

        let mut log_options = LogOptions::new()
            .tags(["uncaught-exception", "critical"])
            .meta("thread", thread)
            .stack(backtrace);
        if let Some(location) = location {
            log_options = log_options.meta("location", location);
        }

        report_blocking(&tracker, &runtime, message, log_options, options.log_timeout);

        previous(info);

        if options.exit_process {
            std::process::exit(1);
        }
    }));

    true
}

/// Store the panic from a helper thread so the hook never blocks a runtime
/// worker, and give up after `timeout`.
fn report_blocking(
    tracker: &ErrorTracker,
    runtime: &Handle,
    message: String,
    options: LogOptions,
    timeout: Duration,
) {
    let (done_tx, done_rx) = mpsc::channel();
    let tracker = tracker.clone();
    let runtime = runtime.clone();

    let spawned = std::thread::Builder::new()
        .name("panic-reporter".to_string())
        .spawn(move || {
            let id = runtime.block_on(tracker.log_error("Uncaught exception", &message, options));
            let _ = done_tx.send(id);
        });

    if let Err(e) = spawned {
        eprintln!("Failed to log error: could not start panic reporter: {}", e);
        return;
    }

    match done_rx.recv_timeout(timeout) {
        Ok(Some(id)) => debug!(issue_id = %id, "Panic recorded"),
        Ok(None) => eprintln!("Failed to log error: panic could not be stored"),
        Err(_) => eprintln!("Failed to log error: panic report timed out after {:?}", timeout),
    }
}

/// Spawn a background task whose failure is logged as a critical issue.
///
/// A task fails when it returns `Err` or panics. The failure is logged and
/// the process keeps running.
pub fn spawn_monitored<F, E>(tracker: ErrorTracker, name: impl Into<String>, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let name = name.into();

    tokio::spawn(async move {
        let message = match tokio::spawn(task).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(join_error) if join_error.is_panic() => {
                let payload = join_error.into_panic();
                payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "task panicked".to_string())
            }
            Err(_) => {
                debug!(task = %name, "Monitored task cancelled");
                return;
            }
        };

        warn!(task = %name, "Background task failed: {}", message);
        let options = LogOptions::new()
            .tags(["unhandled-rejection", "critical"])
            .meta("task", name.as_str());
        tracker.log_error("Unhandled rejection", &message, options).await;
    })
}
