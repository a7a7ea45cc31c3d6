//! Retry sweeper integration tests against an in-memory database.

use std::time::Duration;

use chrono::Utc;
use database::{Database, Environment, NotificationStatus};
use mock_transport::{FlakyTransport, RecordingTransport};
use notifier::{
    EmailRequest, NotificationService, NotifierConfig, RetryPolicy, RetrySweeper, SmsRequest, Transports,
};

async fn service(transports: Transports, retry: RetryPolicy) -> NotificationService {
    let db = Database::connect_in_memory().await.unwrap();
    let config = NotifierConfig::new(Environment::Test).with_retry(retry);
    NotificationService::new(db.pool().clone(), transports, config)
}

#[tokio::test]
async fn test_sweep_retries_failed_attempt() {
    let transport = FlakyTransport::failing(1);
    let service = service(
        Transports::none().with_email(transport.clone()),
        RetryPolicy::immediate(3),
    )
    .await;

    let ids = service
        .send_email(EmailRequest::new("a@example.com", "Hi", "Body"))
        .await
        .unwrap();
    assert_eq!(
        service.get_notification(&ids[0]).await.unwrap().status,
        NotificationStatus::Pending
    );

    let sweeper = RetrySweeper::new(service.clone());
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);

    let n = service.get_notification(&ids[0]).await.unwrap();
    assert_eq!(n.status, NotificationStatus::Sent);
    assert_eq!(n.retry_count, 1);
    assert_eq!(transport.delivered().emails().len(), 1);

    // Nothing left to do.
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
}

#[tokio::test]
async fn test_sweep_respects_backoff() {
    let transport = FlakyTransport::failing(1);
    let retry = RetryPolicy {
        max_retries: 3,
        base_backoff: Duration::from_secs(3600),
        max_backoff: Duration::from_secs(3600),
    };
    let service = service(Transports::none().with_email(transport.clone()), retry).await;

    service
        .send_email(EmailRequest::new("a@example.com", "Hi", "Body"))
        .await
        .unwrap();

    let sweeper = RetrySweeper::new(service.clone());
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn test_sweep_delivers_scheduled_when_due() {
    let transport = RecordingTransport::new();
    let service = service(
        Transports::none().with_sms(transport.clone()),
        RetryPolicy::default(),
    )
    .await;

    let ids = service
        .send_sms(SmsRequest::new("+15551234567", "now").scheduled_for(Utc::now()))
        .await
        .unwrap();
    // A schedule that is not in the future is attempted right away.
    assert_eq!(
        service.get_notification(&ids[0]).await.unwrap().status,
        NotificationStatus::Sent
    );

    let later = service
        .send_sms(
            SmsRequest::new("+15557654321", "later")
                .scheduled_for(Utc::now() + chrono::Duration::milliseconds(200)),
        )
        .await
        .unwrap();

    let sweeper = RetrySweeper::new(service.clone());
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
    assert_eq!(
        service.get_notification(&later[0]).await.unwrap().status,
        NotificationStatus::Sent
    );
    assert_eq!(transport.sms().len(), 2);
}

#[tokio::test]
async fn test_sweeper_stops_on_shutdown() {
    let service = service(Transports::none(), RetryPolicy::default()).await;
    let sweeper = RetrySweeper::new(service).with_interval(Duration::from_millis(10));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(sweeper.run_with_shutdown(async {
        let _ = rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
