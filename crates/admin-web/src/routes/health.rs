//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: String,
    pub database: bool,
    /// Result of the gateway's last health check; `None` when no gateway is configured.
    pub sms_gateway: Option<bool>,
}

/// Health check endpoint. Reports whether the database answers and whether
/// the SMS gateway passed its last check.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = sqlx::query("SELECT 1").execute(state.db.pool()).await.is_ok();
    let sms_gateway = state.sms_gateway.as_ref().map(|client| client.is_connected());
    let healthy = database && sms_gateway.unwrap_or(true);
    Json(Health {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        database,
        sms_gateway,
    })
}
