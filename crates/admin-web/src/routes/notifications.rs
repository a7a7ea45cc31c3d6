//! Notification history and manual sends.

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use database::{
    Notification, NotificationCategory, NotificationFilter, NotificationStats, NotificationStatus,
    NotificationType, Page, PageRequest,
};
use notifier::{EmailRequest, SmsRequest};
use serde::{Deserialize, Serialize};

use super::tracked;
use crate::error::{AdminError, Result};
use crate::state::{action_context, actor, with_request_args, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub status: Option<NotificationStatus>,
    pub category: Option<NotificationCategory>,
    pub user_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl NotificationQuery {
    fn into_parts(self) -> (NotificationFilter, PageRequest) {
        let defaults = PageRequest::default();
        let page = PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        );
        let filter = NotificationFilter {
            notification_type: self.notification_type,
            status: self.status,
            category: self.category,
            user_id: self.user_id,
            search: self.search.filter(|s| !s.trim().is_empty()),
        };
        (filter, page)
    }
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResendResult {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct Bounce {
    pub reason: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Page<Notification>>> {
    let (filter, page) = query.into_parts();
    Ok(Json(state.notifier.list_notifications(&filter, page).await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<NotificationStats>> {
    Ok(Json(state.notifier.notification_stats().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>> {
    Ok(Json(state.notifier.get_notification(&id).await?))
}

pub async fn send_email(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(mut request): Json<EmailRequest>,
) -> Result<Json<Created>> {
    if request.sent_by.is_none() {
        request.sent_by = actor(&headers);
    }
    let context = with_request_args(action_context(&headers, &uri), &request);

    let work = async { Ok::<_, AdminError>(state.notifier.send_email(request).await?) };
    let ids = tracked(&state, "sendEmail", context, work).await?;
    Ok(Json(Created { ids }))
}

pub async fn send_sms(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(mut request): Json<SmsRequest>,
) -> Result<Json<Created>> {
    if request.sent_by.is_none() {
        request.sent_by = actor(&headers);
    }
    let context = with_request_args(action_context(&headers, &uri), &request);

    let work = async { Ok::<_, AdminError>(state.notifier.send_sms(request).await?) };
    let ids = tracked(&state, "sendSms", context, work).await?;
    Ok(Json(Created { ids }))
}

pub async fn resend(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<ResendResult>> {
    let context = action_context(&headers, &uri);
    let sent_by = actor(&headers);

    let work = async { Ok::<_, AdminError>(state.notifier.resend(&id, sent_by.as_deref()).await?) };
    let success = tracked(&state, "resendNotification", context, work).await?;
    Ok(Json(ResendResult { success }))
}

/// Provider callback: the message reached the recipient.
pub async fn delivered(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>> {
    Ok(Json(state.notifier.mark_delivered(&id).await?))
}

/// Provider callback: the message bounced.
pub async fn bounced(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(bounce): Json<Bounce>,
) -> Result<Json<Notification>> {
    Ok(Json(state.notifier.mark_bounced(&id, &bounce.reason).await?))
}
