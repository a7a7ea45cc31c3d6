//! Admin notification settings.

use axum::extract::{OriginalUri, State};
use axum::http::HeaderMap;
use axum::Json;
use database::{AdminSettings, Level};
use serde::Deserialize;

use super::tracked;
use crate::error::{AdminError, Result};
use crate::state::{action_context, actor, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub email_notifications_enabled: bool,
    pub notification_level: Level,
}

pub async fn get(State(state): State<AppState>) -> Result<Json<AdminSettings>> {
    Ok(Json(state.tracker.settings().await?))
}

pub async fn update(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<AdminSettings>> {
    let context = action_context(&headers, &uri);
    let updated_by = actor(&headers);

    let work = async {
        let settings = state
            .tracker
            .update_settings(
                update.email_notifications_enabled,
                update.notification_level,
                updated_by.as_deref(),
            )
            .await?;
        tracing::info!(
            enabled = settings.email_notifications_enabled,
            level = %settings.notification_level,
            "Notification settings updated"
        );
        Ok::<_, AdminError>(settings)
    };

    tracked(&state, "updateSettings", context, work).await.map(Json)
}
