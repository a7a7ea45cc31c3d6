//! Background evaluation of new issues.

use std::sync::Arc;

use database::Issue;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::policy::{NotificationPolicy, PolicyOutcome};
use crate::tracker::ErrorTracker;

/// Messages on the hand-off channel.
#[derive(Debug)]
pub(crate) enum PipelineEvent {
    NewIssue(Box<Issue>),
    Shutdown,
}

/// Drains the hand-off channel and evaluates each new issue in order.
pub(crate) struct NotificationWorker {
    receiver: mpsc::Receiver<PipelineEvent>,
    policy: Arc<NotificationPolicy>,
}

impl NotificationWorker {
    pub(crate) fn new(receiver: mpsc::Receiver<PipelineEvent>, policy: Arc<NotificationPolicy>) -> Self {
        Self { receiver, policy }
    }

    /// Run until the shutdown marker arrives or every sender is gone.
    /// Returns the number of issues evaluated.
    pub(crate) async fn run(mut self) -> usize {
        let mut evaluated = 0;

        while let Some(event) = self.receiver.recv().await {
            match event {
                PipelineEvent::NewIssue(issue) => {
                    let outcome = self.policy.evaluate(&issue).await;
                    if let PolicyOutcome::Failed { reason } = &outcome {
                        warn!(issue_id = %issue.id, "Alert evaluation failed: {}", reason);
                    } else {
                        debug!(issue_id = %issue.id, outcome = ?outcome, "Alert evaluation finished");
                    }
                    evaluated += 1;
                }
                PipelineEvent::Shutdown => break,
            }
        }

        evaluated
    }
}

/// A tracker wired to a background notification worker.
pub struct ErrorPipeline {
    tracker: ErrorTracker,
    sender: mpsc::Sender<PipelineEvent>,
    worker: JoinHandle<usize>,
}

impl ErrorPipeline {
    /// Start the worker and return the pipeline. Must be called inside a
    /// tokio runtime.
    pub fn start(pool: SqlitePool, config: TrackerConfig, policy: NotificationPolicy) -> Self {
        let (sender, receiver) = mpsc::channel(config.handoff_capacity.max(1));
        info!(capacity = config.handoff_capacity, "Starting error notification pipeline");

        let worker = NotificationWorker::new(receiver, Arc::new(policy));
        let worker = tokio::spawn(worker.run());
        let tracker = ErrorTracker::with_channel(pool, config, sender.clone());

        Self {
            tracker,
            sender,
            worker,
        }
    }

    /// The tracker feeding this pipeline. Clone it freely.
    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }

    /// Stop the worker after it has evaluated everything handed off so far.
    /// Returns the number of issues evaluated over the pipeline's lifetime.
    pub async fn shutdown(self) -> usize {
        if self.sender.send(PipelineEvent::Shutdown).await.is_err() {
            warn!("Notification worker already stopped");
        }

        match self.worker.await {
            Ok(evaluated) => {
                info!(evaluated, "Error notification pipeline stopped");
                evaluated
            }
            Err(e) => {
                warn!("Notification worker ended abnormally: {}", e);
                0
            }
        }
    }
}
