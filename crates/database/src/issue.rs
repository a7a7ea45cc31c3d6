//! Issue storage: fingerprint upsert, listing, status changes and stats.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{Issue, IssueStatus, Level, Metadata, NewOccurrence};
use crate::page::{like_pattern, Page, PageRequest};

macro_rules! issue_columns {
    () => {
        "id, fingerprint, title, message, stack, level, status, count, first_seen_at, \
         last_seen_at, url, user_agent, user_id, environment, tags, metadata, resolved_at, \
         resolved_by, created_at, updated_at"
    };
}

/// Metadata key holding the context of the most recent occurrence.
pub const LAST_OCCURRENCE_KEY: &str = "lastOccurrence";

/// Result of folding an occurrence into the issue table.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub issue: Issue,
    /// True when this occurrence created the issue.
    pub is_new: bool,
}

/// Filters for [`list_issues`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub level: Option<Level>,
    /// Substring matched against title and message.
    pub search: Option<String>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_level: BTreeMap<String, i64>,
}

/// Record one occurrence of an error.
///
/// Inserts a new issue or bumps the existing one for the same fingerprint. The
/// upsert and the follow-up escalation run in one transaction, so concurrent
/// occurrences of the same fingerprint cannot create duplicate rows.
pub async fn record_occurrence(pool: &SqlitePool, occurrence: &NewOccurrence) -> Result<Occurrence> {
    let new_id = uuid::Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    let upserted = sqlx::query_as::<_, Issue>(concat!(
        r#"
        INSERT INTO issues (
            id, fingerprint, title, message, stack, level, status, count,
            first_seen_at, last_seen_at, url, user_agent, user_id, environment,
            tags, metadata, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 'open', 1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(fingerprint) DO UPDATE SET
            count = issues.count + 1,
            last_seen_at = MAX(issues.last_seen_at, excluded.last_seen_at),
            updated_at = excluded.updated_at
        RETURNING "#,
        issue_columns!()
    ))
    .bind(&new_id)
    .bind(&occurrence.fingerprint)
    .bind(&occurrence.title)
    .bind(&occurrence.message)
    .bind(&occurrence.stack)
    .bind(occurrence.level)
    .bind(occurrence.seen_at)
    .bind(occurrence.seen_at)
    .bind(&occurrence.url)
    .bind(&occurrence.user_agent)
    .bind(&occurrence.user_id)
    .bind(&occurrence.environment)
    .bind(Json(&occurrence.tags))
    .bind(Json(&occurrence.metadata))
    .bind(occurrence.seen_at)
    .bind(occurrence.seen_at)
    .fetch_one(&mut *tx)
    .await?;

    if upserted.id == new_id {
        tx.commit().await?;
        return Ok(Occurrence {
            issue: upserted,
            is_new: true,
        });
    }

    let level = upserted.level.escalate(occurrence.level);
    let metadata = merge_metadata(&upserted.metadata, occurrence);
    let tags = merge_tags(&upserted.tags, &occurrence.tags);

    let issue = sqlx::query_as::<_, Issue>(concat!(
        r#"
        UPDATE issues
        SET level = ?, metadata = ?, tags = ?
        WHERE id = ?
        RETURNING "#,
        issue_columns!()
    ))
    .bind(level)
    .bind(Json(&metadata))
    .bind(Json(&tags))
    .bind(&upserted.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Occurrence {
        issue,
        is_new: false,
    })
}

/// Merge incoming metadata over existing metadata and record the occurrence context.
///
/// Incoming keys replace existing keys of the same name; untouched keys survive.
pub fn merge_metadata(existing: &Metadata, occurrence: &NewOccurrence) -> Metadata {
    let mut merged = existing.clone();
    merged.extend(
        occurrence
            .metadata
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    merged.insert(
        LAST_OCCURRENCE_KEY.to_string(),
        serde_json::json!({
            "url": occurrence.url,
            "userAgent": occurrence.user_agent,
            "userId": occurrence.user_id,
            "timestamp": occurrence.seen_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    );
    merged
}

fn merge_tags(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: BTreeSet<&str> = existing.iter().map(String::as_str).collect();
    let mut tags = existing.to_vec();
    for tag in incoming {
        if seen.insert(tag.as_str()) {
            tags.push(tag.clone());
        }
    }
    tags
}

/// Get an issue by ID.
pub async fn get_issue(pool: &SqlitePool, id: &str) -> Result<Issue> {
    sqlx::query_as::<_, Issue>(concat!("SELECT ", issue_columns!(), " FROM issues WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Issue",
            id: id.to_string(),
        })
}

/// Get an issue by fingerprint, if one exists.
pub async fn find_by_fingerprint(pool: &SqlitePool, fingerprint: &str) -> Result<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(concat!(
        "SELECT ",
        issue_columns!(),
        " FROM issues WHERE fingerprint = ?"
    ))
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;

    Ok(issue)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &IssueFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(level) = filter.level {
        builder.push(" AND level = ").push_bind(level);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR message LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// List issues matching a filter, most recently seen first.
pub async fn list_issues(
    pool: &SqlitePool,
    filter: &IssueFilter,
    page: PageRequest,
) -> Result<Page<Issue>> {
    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM issues");
    push_filters(&mut count_query, filter);
    let total = count_query.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Sqlite>::new(concat!("SELECT ", issue_columns!(), " FROM issues"));
    push_filters(&mut query, filter);
    query
        .push(" ORDER BY last_seen_at DESC, id LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());

    let items = query.build_query_as::<Issue>().fetch_all(pool).await?;

    Ok(Page {
        items,
        total,
        page: page.page.max(1),
        limit: page.limit(),
    })
}

/// Change an issue's status.
///
/// Leaving `open` stamps `resolved_at` and `resolved_by`; returning to `open`
/// clears them.
pub async fn update_issue_status(
    pool: &SqlitePool,
    id: &str,
    status: IssueStatus,
    resolved_by: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Issue> {
    sqlx::query_as::<_, Issue>(concat!(
        r#"
        UPDATE issues
        SET resolved_at = CASE
                WHEN ?1 = 'open' THEN NULL
                WHEN status = 'open' OR resolved_at IS NULL THEN ?2
                ELSE resolved_at
            END,
            resolved_by = CASE
                WHEN ?1 = 'open' THEN NULL
                WHEN status = 'open' OR resolved_at IS NULL THEN ?3
                ELSE COALESCE(?3, resolved_by)
            END,
            status = ?1,
            updated_at = ?2
        WHERE id = ?4
        RETURNING "#,
        issue_columns!()
    ))
    .bind(status)
    .bind(now)
    .bind(resolved_by)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Issue",
        id: id.to_string(),
    })
}

/// Count issues by status and by level.
pub async fn issue_stats(pool: &SqlitePool) -> Result<IssueStats> {
    let by_status = sqlx::query_as::<_, (IssueStatus, i64)>(
        r#"
        SELECT status, COUNT(*) as count
        FROM issues
        GROUP BY status
        "#,
    )
    .fetch_all(pool)
    .await?;

    let by_level = sqlx::query_as::<_, (Level, i64)>(
        r#"
        SELECT level, COUNT(*) as count
        FROM issues
        GROUP BY level
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut stats = IssueStats {
        by_status: IssueStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect(),
        by_level: Level::ALL.iter().map(|l| (l.to_string(), 0)).collect(),
        ..Default::default()
    };

    for (status, count) in by_status {
        stats.total += count;
        stats.by_status.insert(status.to_string(), count);
    }
    for (level, count) in by_level {
        stats.by_level.insert(level.to_string(), count);
    }

    Ok(stats)
}
