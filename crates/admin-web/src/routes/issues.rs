//! Issue listing and triage.

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use database::{Issue, IssueFilter, IssueStats, IssueStatus, Level, Page, PageRequest};
use serde::Deserialize;

use super::tracked;
use crate::error::{AdminError, Result};
use crate::state::{action_context, actor, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct IssueQuery {
    pub status: Option<IssueStatus>,
    pub level: Option<Level>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl IssueQuery {
    fn into_parts(self) -> (IssueFilter, PageRequest) {
        let defaults = PageRequest::default();
        let page = PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        );
        let filter = IssueFilter {
            status: self.status,
            level: self.level,
            search: self.search.filter(|s| !s.trim().is_empty()),
        };
        (filter, page)
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<IssueQuery>,
) -> Result<Json<Page<Issue>>> {
    let (filter, page) = query.into_parts();
    Ok(Json(state.tracker.list_issues(&filter, page).await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<IssueStats>> {
    Ok(Json(state.tracker.issue_stats().await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Issue>> {
    Ok(Json(state.tracker.get_issue(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: IssueStatus,
    /// Falls back to the acting user.
    #[serde(default)]
    pub resolved_by: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Issue>> {
    let context = action_context(&headers, &uri);
    let resolved_by = update.resolved_by.or_else(|| actor(&headers));

    let work = async {
        let issue = state
            .tracker
            .update_issue_status(&id, update.status, resolved_by.as_deref())
            .await?;
        tracing::info!(issue_id = %issue.id, status = %issue.status, "Issue status updated");
        Ok::<_, AdminError>(issue)
    };

    tracked(&state, "updateIssueStatus", context, work).await.map(Json)
}
