//! The notification dispatcher.

use std::sync::Arc;

use chrono::Utc;
use database::notification::{self, NotificationFilter, NotificationStats};
use database::validation::{validate_email, validate_phone, validate_subject};
use database::{
    NewNotification, Notification, NotificationStatus, NotificationType, Page, PageRequest,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};
use transport_core::{EmailMessage, EmailTransport, SmsMessage, SmsTransport, TransportReceipt};

use crate::config::NotifierConfig;
use crate::error::{NotifierError, Result};
use crate::request::{EmailRequest, SmsRequest};
use crate::retry::FailureAction;

/// The delivery backends available to the dispatcher. Either may be absent.
#[derive(Clone, Default)]
pub struct Transports {
    pub email: Option<Arc<dyn EmailTransport>>,
    pub sms: Option<Arc<dyn SmsTransport>>,
}

impl Transports {
    /// No transports at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_email(mut self, transport: impl EmailTransport + 'static) -> Self {
        self.email = Some(Arc::new(transport));
        self
    }

    pub fn with_sms(mut self, transport: impl SmsTransport + 'static) -> Self {
        self.sms = Some(Arc::new(transport));
        self
    }
}

impl std::fmt::Debug for Transports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transports")
            .field("email", &self.email.as_ref().map(|t| t.name().to_string()))
            .field("sms", &self.sms.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}

/// Persists notifications and hands them to the configured transports.
#[derive(Debug, Clone)]
pub struct NotificationService {
    pool: SqlitePool,
    transports: Transports,
    config: NotifierConfig,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, transports: Transports, config: NotifierConfig) -> Self {
        info!(
            environment = %config.environment,
            email = ?transports.email.as_ref().map(|t| t.name().to_string()),
            sms = ?transports.sms.as_ref().map(|t| t.name().to_string()),
            "Notification service ready"
        );
        Self {
            pool,
            transports,
            config,
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Send an email to every recipient in the request.
    ///
    /// All recipients are validated before any row is written. Each recipient
    /// gets its own notification, attempted immediately unless scheduled for
    /// later. Returns the new notification ids in recipient order.
    pub async fn send_email(&self, request: EmailRequest) -> Result<Vec<String>> {
        let recipients = request.to.into_vec();
        if recipients.is_empty() {
            return Err(NotifierError::NoRecipients);
        }
        for recipient in &recipients {
            validate_email(recipient)?;
        }
        validate_subject(&request.subject)?;

        let max_retries = request.max_retries.unwrap_or(self.config.retry.max_retries);
        let mut ids = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let new = NewNotification {
                notification_type: NotificationType::Email,
                recipient,
                subject: Some(request.subject.clone()),
                content: request.content.clone(),
                html_content: request.html_content.clone(),
                template_id: request.template_id.clone(),
                template_data: request.template_data.clone(),
                category: request.category,
                priority: request.priority,
                max_retries,
                scheduled_for: request.scheduled_for,
                user_id: request.user_id.clone(),
                sent_by: request.sent_by.clone(),
            };
            ids.push(self.enqueue(new).await?);
        }

        Ok(ids)
    }

    /// Send a text message to every phone number in the request.
    pub async fn send_sms(&self, request: SmsRequest) -> Result<Vec<String>> {
        let recipients = request.to.into_vec();
        if recipients.is_empty() {
            return Err(NotifierError::NoRecipients);
        }
        for recipient in &recipients {
            validate_phone(recipient)?;
        }

        let max_retries = request.max_retries.unwrap_or(self.config.retry.max_retries);
        let mut ids = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let new = NewNotification {
                notification_type: NotificationType::Sms,
                recipient,
                subject: None,
                content: request.content.clone(),
                html_content: None,
                template_id: request.template_id.clone(),
                template_data: request.template_data.clone(),
                category: request.category,
                priority: request.priority,
                max_retries,
                scheduled_for: request.scheduled_for,
                user_id: request.user_id.clone(),
                sent_by: request.sent_by.clone(),
            };
            ids.push(self.enqueue(new).await?);
        }

        Ok(ids)
    }

    async fn enqueue(&self, new: NewNotification) -> Result<String> {
        let now = Utc::now();
        let created = notification::create_notification(&self.pool, &new, now).await?;
        let id = created.id.clone();

        match created.scheduled_for {
            Some(at) if at > now => {
                info!(id = %id, scheduled_for = %at, "Notification scheduled");
            }
            _ => {
                self.attempt(created).await?;
            }
        }

        Ok(id)
    }

    /// Make one delivery attempt and record the outcome.
    ///
    /// Transport failures are not errors here: they are recorded on the row
    /// according to the retry policy. Only persistence failures are returned.
    pub async fn attempt(&self, notification: Notification) -> Result<Notification> {
        let outcome = match notification.notification_type {
            NotificationType::Email => match &self.transports.email {
                Some(transport) => Some(transport.send_email(&email_message(&notification)).await),
                None => None,
            },
            NotificationType::Sms => match &self.transports.sms {
                Some(transport) => {
                    let message = SmsMessage::new(&notification.recipient, &notification.content);
                    Some(transport.send_sms(&message).await)
                }
                None => None,
            },
        };

        let now = Utc::now();
        let updated = match outcome {
            Some(Ok(TransportReceipt { provider_response })) => {
                info!(
                    id = %notification.id,
                    kind = %notification.notification_type,
                    "Notification sent"
                );
                notification::mark_sent(&self.pool, &notification.id, &provider_response, now).await?
            }
            Some(Err(e)) => self.record_failure(&notification, &e.to_string()).await?,
            None if self.config.environment.is_production() => {
                let reason = format!("no {} transport configured", notification.notification_type);
                warn!(id = %notification.id, "{}", reason);
                notification::mark_failed(
                    &self.pool,
                    &notification.id,
                    notification.retry_count,
                    &reason,
                    now,
                )
                .await?
            }
            None => {
                info!(
                    id = %notification.id,
                    kind = %notification.notification_type,
                    recipient = %notification.recipient,
                    "No transport configured, simulating delivery"
                );
                notification::mark_sent(&self.pool, &notification.id, &json!({ "simulated": true }), now)
                    .await?
            }
        };

        Ok(updated)
    }

    async fn record_failure(&self, notification: &Notification, reason: &str) -> Result<Notification> {
        let now = Utc::now();
        let action = self
            .config
            .retry
            .on_failure(notification.retry_count, notification.max_retries);

        let updated = match action {
            FailureAction::Retry { retry_count } => {
                warn!(
                    id = %notification.id,
                    retry_count,
                    max_retries = notification.max_retries,
                    "Delivery failed, will retry: {}",
                    reason
                );
                notification::mark_retrying(&self.pool, &notification.id, retry_count, reason, now).await?
            }
            FailureAction::GiveUp { retry_count } => {
                warn!(
                    id = %notification.id,
                    retry_count,
                    "Delivery failed permanently: {}",
                    reason
                );
                notification::mark_failed(&self.pool, &notification.id, retry_count, reason, now).await?
            }
        };

        Ok(updated)
    }

    /// Reset a notification and deliver it again right away.
    ///
    /// Allowed for failed or bounced notifications and for any notification
    /// that still has retries left. Returns whether it ended up sent.
    pub async fn resend(&self, id: &str, sent_by: Option<&str>) -> Result<bool> {
        let current = notification::get_notification(&self.pool, id).await?;
        if !current.can_resend() {
            return Err(NotifierError::NotResendable {
                id: id.to_string(),
                status: current.status,
            });
        }

        let reset = notification::reset_for_resend(&self.pool, id, sent_by, Utc::now()).await?;
        info!(id = %id, sent_by = ?sent_by, "Resending notification");

        let updated = self.attempt(reset).await?;
        Ok(updated.status == NotificationStatus::Sent)
    }

    /// Make one more attempt at a pending notification without resetting it.
    pub async fn retry(&self, id: &str) -> Result<Notification> {
        let current = notification::get_notification(&self.pool, id).await?;
        if current.status != NotificationStatus::Pending {
            return Err(NotifierError::NotPending {
                id: id.to_string(),
                status: current.status,
            });
        }
        self.attempt(current).await
    }

    /// Record provider confirmation that a notification arrived.
    pub async fn mark_delivered(&self, id: &str) -> Result<Notification> {
        Ok(notification::mark_delivered(&self.pool, id, Utc::now()).await?)
    }

    /// Record a provider bounce.
    pub async fn mark_bounced(&self, id: &str, reason: &str) -> Result<Notification> {
        Ok(notification::mark_bounced(&self.pool, id, reason, Utc::now()).await?)
    }

    pub async fn get_notification(&self, id: &str) -> Result<Notification> {
        Ok(notification::get_notification(&self.pool, id).await?)
    }

    pub async fn list_notifications(
        &self,
        filter: &NotificationFilter,
        page: PageRequest,
    ) -> Result<Page<Notification>> {
        Ok(notification::list_notifications(&self.pool, filter, page).await?)
    }

    pub async fn notification_stats(&self) -> Result<NotificationStats> {
        Ok(notification::notification_stats(&self.pool).await?)
    }
}

fn email_message(notification: &Notification) -> EmailMessage {
    let message = EmailMessage::new(
        &notification.recipient,
        notification.subject.clone().unwrap_or_default(),
        &notification.content,
    );
    match &notification.html_content {
        Some(html) => message.with_html(html),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use chrono::Duration;
    use database::{Database, Environment, NotificationCategory};
    use mock_transport::{FlakyTransport, RecordingTransport};

    async fn service_with(transports: Transports, environment: Environment) -> NotificationService {
        let db = Database::connect_in_memory().await.unwrap();
        let config = NotifierConfig::new(environment).with_retry(RetryPolicy::immediate(3));
        NotificationService::new(db.pool().clone(), transports, config)
    }

    #[tokio::test]
    async fn test_one_row_per_recipient() {
        let transport = RecordingTransport::new();
        let service = service_with(
            Transports::none().with_email(transport.clone()),
            Environment::Development,
        )
        .await;

        let ids = service
            .send_email(
                EmailRequest::new(vec!["a@example.com", "b@example.com"], "Hello", "Body")
                    .with_html("<p>Body</p>"),
            )
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        for id in &ids {
            let n = service.get_notification(id).await.unwrap();
            assert_eq!(n.status, NotificationStatus::Sent);
            assert!(n.sent_at.is_some());
            assert!(n.provider_response.is_some());
        }

        let sent = transport.emails();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[1].html.as_deref(), Some("<p>Body</p>"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_writes_nothing() {
        let service = service_with(Transports::none(), Environment::Development).await;

        let result = service
            .send_email(EmailRequest::new(vec!["a@example.com", "not-an-email"], "Hi", "Body"))
            .await;
        assert!(matches!(result, Err(NotifierError::Validation(_))));

        let result = service.send_sms(SmsRequest::new("5551234", "hi")).await;
        assert!(matches!(result, Err(NotifierError::Validation(_))));

        let result = service.send_sms(SmsRequest::new(Vec::<String>::new(), "hi")).await;
        assert!(matches!(result, Err(NotifierError::NoRecipients)));

        assert_eq!(service.notification_stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_then_resend() {
        let transport = FlakyTransport::always_failing();
        let service = service_with(
            Transports::none().with_email(transport.clone()),
            Environment::Development,
        )
        .await;

        let ids = service
            .send_email(EmailRequest::new("a@example.com", "Hi", "Body"))
            .await
            .unwrap();
        let id = &ids[0];

        let n = service.get_notification(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.retry_count, 1);
        assert_eq!(n.failure_reason.as_deref(), Some("transport unavailable: connection refused"));

        let n = service.retry(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.retry_count, 2);

        let n = service.retry(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.retry_count, 3);
        assert!(n.failure_reason.is_some());
        assert_eq!(transport.attempts(), 3);

        let err = service.retry(id).await.unwrap_err();
        assert!(matches!(err, NotifierError::NotPending { .. }));

        transport.fail_next(0);
        assert!(service.resend(id, Some("admin-1")).await.unwrap());

        let n = service.get_notification(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.retry_count, 0);
        assert!(n.failure_reason.is_none());
        assert_eq!(n.sent_by.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn test_production_without_transport_fails() {
        let service = service_with(Transports::none(), Environment::Production).await;

        let ids = service
            .send_sms(SmsRequest::new("+15551234567", "hi"))
            .await
            .unwrap();

        let n = service.get_notification(&ids[0]).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.failure_reason.as_deref(), Some("no sms transport configured"));
    }

    #[tokio::test]
    async fn test_development_without_transport_simulates() {
        let service = service_with(Transports::none(), Environment::Development).await;

        let ids = service
            .send_email(EmailRequest::new("a@example.com", "Hi", "Body"))
            .await
            .unwrap();

        let n = service.get_notification(&ids[0]).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.provider_response.unwrap().0, json!({ "simulated": true }));
    }

    #[tokio::test]
    async fn test_future_schedule_stays_pending() {
        let transport = RecordingTransport::new();
        let service = service_with(
            Transports::none().with_sms(transport.clone()),
            Environment::Development,
        )
        .await;

        let ids = service
            .send_sms(SmsRequest::new("+15551234567", "later").scheduled_for(Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        let n = service.get_notification(&ids[0]).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.retry_count, 0);
        assert!(transport.sms().is_empty());
    }

    #[tokio::test]
    async fn test_resend_refused_without_retries_left() {
        let service = service_with(
            Transports::none().with_email(RecordingTransport::new()),
            Environment::Development,
        )
        .await;

        let ids = service
            .send_email(EmailRequest::new("a@example.com", "Hi", "Body").with_max_retries(0))
            .await
            .unwrap();

        let err = service.resend(&ids[0], None).await.unwrap_err();
        assert!(matches!(
            err,
            NotifierError::NotResendable {
                status: NotificationStatus::Sent,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_provider_feedback() {
        let service = service_with(
            Transports::none().with_email(RecordingTransport::new()),
            Environment::Development,
        )
        .await;

        let ids = service
            .send_email(
                EmailRequest::new(vec!["a@example.com", "b@example.com"], "Hi", "Body")
                    .with_category(NotificationCategory::Auth),
            )
            .await
            .unwrap();

        let delivered = service.mark_delivered(&ids[0]).await.unwrap();
        assert_eq!(delivered.status, NotificationStatus::Delivered);
        assert!(delivered.sent_at.is_some());

        let bounced = service.mark_bounced(&ids[1], "mailbox does not exist").await.unwrap();
        assert_eq!(bounced.status, NotificationStatus::Bounced);
        assert_eq!(bounced.failure_reason.as_deref(), Some("mailbox does not exist"));
        assert!(bounced.can_resend());

        let stats = service.notification_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category.get("auth"), Some(&2));
        assert_eq!(stats.by_status.get("bounced"), Some(&1));
    }
}
