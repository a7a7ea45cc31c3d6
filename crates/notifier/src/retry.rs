//! Retry accounting and the background retry sweeper.

use std::time::Duration;

use chrono::{DateTime, Utc};
use database::{notification, Notification};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::service::NotificationService;

/// Longest backoff the policy will ever compute.
const BACKOFF_CEILING: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// What to do after a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Keep the notification pending with the new retry count.
    Retry { retry_count: i64 },
    /// Attempts are used up; the notification fails for good.
    GiveUp { retry_count: i64 },
}

/// Retry limits and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Default limit for new notifications.
    pub max_retries: i64,
    /// Delay before the first retry. Doubles with each further attempt.
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(60 * 60),
        }
    }
}

impl RetryPolicy {
    /// A policy with no backoff, for tests and manual sweeps.
    pub fn immediate(max_retries: i64) -> Self {
        Self {
            max_retries,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Account for one failed attempt.
    ///
    /// The count is incremented first and capped at `max_retries`; reaching
    /// the cap is terminal.
    pub fn on_failure(&self, retry_count: i64, max_retries: i64) -> FailureAction {
        let max_retries = max_retries.max(0);
        let retry_count = (retry_count + 1).min(max_retries);

        if retry_count >= max_retries {
            FailureAction::GiveUp { retry_count }
        } else {
            FailureAction::Retry { retry_count }
        }
    }

    /// Delay before the attempt following `retry_count` failures.
    pub fn backoff(&self, retry_count: i64) -> Duration {
        let exponent = u32::try_from(retry_count.max(1) - 1).unwrap_or(u32::MAX).min(31);
        self.base_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
            .min(BACKOFF_CEILING)
    }

    /// Whether a pending notification should be attempted at `now`.
    ///
    /// Scheduled notifications that were never attempted are due as soon as
    /// their time comes. Everything else waits out its backoff, measured from
    /// the last update.
    pub fn is_due(&self, notification: &Notification, now: DateTime<Utc>) -> bool {
        if let Some(scheduled_for) = notification.scheduled_for {
            if scheduled_for > now {
                return false;
            }
            if notification.retry_count == 0 {
                return true;
            }
        }

        let wait = chrono::Duration::seconds(self.backoff(notification.retry_count).as_secs() as i64);
        notification.updated_at + wait <= now
    }
}

/// Periodically re-attempts pending notifications that are due.
pub struct RetrySweeper {
    service: NotificationService,
    interval: Duration,
    batch: u32,
}

impl RetrySweeper {
    /// Create a sweeper using the service's configured interval and batch size.
    pub fn new(service: NotificationService) -> Self {
        let interval = service.config().sweep_interval;
        let batch = service.config().sweep_batch;
        Self {
            service,
            interval,
            batch,
        }
    }

    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attempt every due notification once. Returns how many were attempted.
    pub async fn sweep_once(&self) -> Result<usize> {
        let now = Utc::now();
        let policy = self.service.config().retry;
        let candidates = notification::list_due(self.service.pool(), now, self.batch).await?;

        let mut attempted = 0;
        for candidate in candidates.into_iter().filter(|n| policy.is_due(n, now)) {
            debug!(id = %candidate.id, retry_count = candidate.retry_count, "Re-attempting notification");
            match self.service.attempt(candidate).await {
                Ok(_) => attempted += 1,
                Err(e) => warn!("Retry sweep attempt failed: {}", e),
            }
        }

        if attempted > 0 {
            info!(attempted, "Retry sweep complete");
        }
        Ok(attempted)
    }

    /// Sweep on every tick until `shutdown_signal` completes.
    pub async fn run_with_shutdown<S>(self, shutdown_signal: S)
    where
        S: std::future::Future<Output = ()> + Send,
    {
        info!(interval = ?self.interval, "Starting retry sweeper");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown_signal);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown_signal => {
                    info!("Shutdown signal received, stopping retry sweeper");
                    return;
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        warn!("Retry sweep failed: {}", e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_failures_exhaust_default_policy() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.on_failure(0, 3), FailureAction::Retry { retry_count: 1 });
        assert_eq!(policy.on_failure(1, 3), FailureAction::Retry { retry_count: 2 });
        assert_eq!(policy.on_failure(2, 3), FailureAction::GiveUp { retry_count: 3 });
    }

    #[test]
    fn test_zero_retries_fails_immediately() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.on_failure(0, 0), FailureAction::GiveUp { retry_count: 0 });
    }

    #[test]
    fn test_count_never_exceeds_limit() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.on_failure(5, 3), FailureAction::GiveUp { retry_count: 3 });
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(60),
        };

        assert_eq!(policy.backoff(0), Duration::from_secs(10));
        assert_eq!(policy.backoff(1), Duration::from_secs(10));
        assert_eq!(policy.backoff(2), Duration::from_secs(20));
        assert_eq!(policy.backoff(3), Duration::from_secs(40));
        assert_eq!(policy.backoff(4), Duration::from_secs(60));
        assert_eq!(policy.backoff(100), Duration::from_secs(60));
    }
}
