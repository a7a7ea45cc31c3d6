//! Error ingest endpoint used by the client capture layer.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use database::{Level, Metadata};
use error_tracker::LogOptions;
use serde::{Deserialize, Serialize};

use crate::error::{AdminError, Result};
use crate::state::AppState;

/// A reported error, as sent by browsers and other clients.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestPayload {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: String,
}

/// Store a reported error.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IngestPayload>,
) -> Result<Json<IngestResponse>> {
    if payload.title.trim().is_empty() || payload.message.trim().is_empty() {
        return Err(AdminError::BadRequest(
            "title and message are required".to_string(),
        ));
    }

    let user_agent = payload.user_agent.or_else(|| {
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let options = LogOptions {
        level: payload.level,
        url: payload.url,
        user_agent,
        user_id: payload.user_id,
        tags: payload.tags,
        metadata: payload.metadata,
        stack: payload.stack,
        ..LogOptions::default()
    };

    let id = state
        .tracker
        .log(&payload.title, &payload.message, options)
        .await
        .ok_or_else(|| AdminError::Internal("error report could not be stored".to_string()))?;

    Ok(Json(IngestResponse { id }))
}
