//! Admin and ingest server for the error tracker.
//!
//! Serves the JSON API used by the client capture layer and the admin
//! dashboard, runs the notification pipeline and the retry sweeper, and
//! reports its own panics and background task failures as issues.

mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use database::Database;
use error_tracker::{
    install_panic_hook, spawn_monitored, DatabaseDirectory, ErrorPipeline, NotificationPolicy,
    PanicHookOptions, TrackerConfig,
};
use mailer::{SmtpConfig, SmtpMailer};
use notifier::{NotificationService, NotifierConfig, RetrySweeper, Transports};
use sms_gateway::{GatewayConfig, SmsClient};
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("admin_web=info".parse()?),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting admin web server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Delivery transports
    let mut transports = Transports::none();
    let mut sms_gateway = None;
    if SmtpConfig::is_configured_in_env() {
        let mailer = SmtpMailer::new(SmtpConfig::from_env()?)?;
        transports = transports.with_email(mailer);
        info!("SMTP transport configured");
    } else {
        warn!("SMTP not configured; email delivery is simulated outside production");
    }
    if GatewayConfig::is_configured_in_env() {
        let client = SmsClient::new(GatewayConfig::from_env()?)?;
        client.start_health_monitor(config.gateway_health_interval);
        sms_gateway = Some(client.clone());
        transports = transports.with_sms(client);
        info!("SMS gateway transport configured");
    } else {
        warn!("SMS gateway not configured; SMS delivery is simulated outside production");
    }

    // Dispatcher
    let notifier_config = NotifierConfig::from_env()?;
    info!(environment = %notifier_config.environment, "Notification dispatcher ready");
    let notifier = NotificationService::new(db.pool().clone(), transports, notifier_config);

    // Tracker and its notification pipeline
    let tracker_config = TrackerConfig::from_env()?;
    let policy = NotificationPolicy::new(
        db.pool().clone(),
        Arc::new(DatabaseDirectory::new(db.pool().clone())),
        notifier.clone(),
        tracker_config.app_name.clone(),
    );
    let pipeline = ErrorPipeline::start(db.pool().clone(), tracker_config, policy);
    let tracker = pipeline.tracker().clone();

    let options = PanicHookOptions::from_tracker(&tracker);
    install_panic_hook(tracker.clone(), tokio::runtime::Handle::current(), options);

    // Retry sweeper
    let (stop_sweeper, sweeper_stopped) = oneshot::channel::<()>();
    let sweeper = RetrySweeper::new(notifier.clone());
    let sweeper_task = spawn_monitored(tracker.clone(), "retry-sweeper", async move {
        sweeper
            .run_with_shutdown(async {
                let _ = sweeper_stopped.await;
            })
            .await;
        Ok::<(), std::convert::Infallible>(())
    });

    // Build application state
    let mut state = AppState::new(db.clone(), tracker, notifier);
    if let Some(client) = sms_gateway {
        state = state.with_sms_gateway(client);
    }

    // Build router
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    info!(addr = %config.addr, "Admin web server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    // Drain background work
    let _ = stop_sweeper.send(());
    if let Err(e) = sweeper_task.await {
        warn!("Retry sweeper ended abnormally: {}", e);
    }
    let evaluated = pipeline.shutdown().await;
    info!(evaluated, "Issues evaluated this run");
    db.close().await;

    Ok(())
}
