//! Handlers for the audit trail (`/iam/audit-logs`) and the activity feed
//! (`/iam/activity`).
//!
//! The raw audit endpoints require `audit:read`. The activity feed is open to
//! every user but shows only the caller's own entries without `audit:read`.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use gatekeeper_core::audit::csv_field;
use gatekeeper_core::permission::names;
use gatekeeper_core::types::{DbId, Timestamp};
use gatekeeper_db::models::audit::{AuditLog, AuditLogPage, AuditQuery};
use gatekeeper_db::repositories::AuditLogRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Default page size of the activity feed.
const ACTIVITY_DEFAULT_LIMIT: i64 = 20;

/// Largest page of the activity feed.
const ACTIVITY_MAX_LIMIT: i64 = 100;

/// Export window when `from` is omitted.
const DEFAULT_EXPORT_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /iam/audit-logs`.
#[derive(Debug, Deserialize)]
pub struct AuditLogQueryParams {
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for `GET /iam/audit-logs/export`.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub format: Option<String>,
}

/// Query parameters for `GET /iam/activity`.
#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(alias = "actionType")]
    pub action_type: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<DbId>,
    pub resource: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Page of the activity feed.
#[derive(Debug, Serialize)]
pub struct ActivityPage {
    pub logs: Vec<AuditLog>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Which end of a date-only value a bound refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date.
///
/// A bare date covers the whole day: as a start bound it is midnight, as an
/// end bound the last millisecond of the day.
fn parse_timestamp(value: &str, bound: Bound) -> AppResult<Timestamp> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid date '{value}': expected RFC 3339 or YYYY-MM-DD"
        ))
    })?;
    let naive = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_milli_opt(23, 59, 59, 999),
    };
    naive
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{value}'")))
}

fn parse_optional(value: Option<&str>, bound: Bound) -> AppResult<Option<Timestamp>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_timestamp(v, bound))
        .transpose()
}

/// Drop empty and `all` filter values sent by list UIs.
fn filter_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "all")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/iam/audit-logs
///
/// Filtered, paginated audit entries, newest first.
pub async fn query_audit_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<AuditLogQueryParams>,
) -> AppResult<Json<AuditLogPage>> {
    auth.require(names::AUDIT_READ)?;

    let query = AuditQuery {
        user_id: params.user_id,
        action: filter_value(params.action),
        resource_type: filter_value(params.resource_type),
        status: filter_value(params.status),
        from: parse_optional(params.from.as_deref(), Bound::Start)?,
        to: parse_optional(params.to.as_deref(), Bound::End)?,
        search: filter_value(params.search),
        limit: params.limit,
        offset: params.offset,
    };

    let items = AuditLogRepo::query(&state.pool, &query).await?;
    let total = AuditLogRepo::count(&state.pool, &query).await?;

    Ok(Json(AuditLogPage { items, total }))
}

/// GET /api/iam/audit-logs/export?format=csv|json&from=X&to=Y
///
/// Entries in a date range, oldest first. The range defaults to the last
/// 30 days.
pub async fn export_audit_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    auth.require(names::AUDIT_READ)?;

    let from = parse_optional(params.from.as_deref(), Bound::Start)?
        .unwrap_or_else(|| Utc::now() - Duration::days(DEFAULT_EXPORT_DAYS));
    let to = parse_optional(params.to.as_deref(), Bound::End)?.unwrap_or_else(Utc::now);

    let query = AuditQuery {
        from: Some(from),
        to: Some(to),
        ..Default::default()
    };
    let logs = AuditLogRepo::export(&state.pool, &query).await?;

    match params.format.as_deref().unwrap_or("json") {
        "csv" => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"audit-logs.csv\"",
                ),
            ],
            render_csv(&logs),
        )
            .into_response()),
        "json" => Ok(Json(logs).into_response()),
        other => Err(AppError::BadRequest(format!(
            "Unsupported export format '{other}' (expected csv or json)"
        ))),
    }
}

/// GET /api/iam/activity
pub async fn activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ActivityParams>,
) -> AppResult<Json<ActivityPage>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(ACTIVITY_DEFAULT_LIMIT)
        .clamp(1, ACTIVITY_MAX_LIMIT);

    let user_id = if auth.can(names::AUDIT_READ) {
        params.user_id
    } else {
        Some(auth.user_id)
    };

    let query = AuditQuery {
        user_id,
        action: filter_value(params.action_type),
        resource_type: filter_value(params.resource),
        status: filter_value(params.status),
        from: parse_optional(params.start_date.as_deref(), Bound::Start)?,
        to: parse_optional(params.end_date.as_deref(), Bound::End)?,
        search: filter_value(params.search),
        limit: Some(limit),
        offset: Some(page.saturating_sub(1).saturating_mul(limit)),
    };

    let logs = AuditLogRepo::query(&state.pool, &query).await?;
    let total = AuditLogRepo::count(&state.pool, &query).await?;

    Ok(Json(ActivityPage {
        logs,
        total,
        page,
        limit,
    }))
}

fn render_csv(logs: &[AuditLog]) -> String {
    let mut out = String::from(
        "id,timestamp,user_id,user_email,action,resource_type,resource_id,status,ip_address,user_agent,details\n",
    );
    for log in logs {
        let details = log
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        let fields = [
            log.id.to_string(),
            log.timestamp.to_rfc3339(),
            log.user_id.map(|id| id.to_string()).unwrap_or_default(),
            log.user_email.clone().unwrap_or_default(),
            log.action.clone(),
            log.resource_type.clone().unwrap_or_default(),
            log.resource_id.clone().unwrap_or_default(),
            log.status.clone(),
            log.ip_address.clone().unwrap_or_default(),
            log.user_agent.clone().unwrap_or_default(),
            details,
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Datelike, Timelike};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn date_only_bounds_cover_the_whole_day() {
        let start = parse_timestamp("2026-03-01", Bound::Start).unwrap();
        let end = parse_timestamp("2026-03-01", Bound::End).unwrap();
        assert_eq!((start.day(), start.hour()), (1, 0));
        assert_eq!((end.day(), end.hour(), end.minute()), (1, 23, 59));
    }

    #[test]
    fn rfc3339_is_converted_to_utc() {
        let ts = parse_timestamp("2026-03-01T10:00:00+02:00", Bound::Start).unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert_matches!(
            parse_timestamp("yesterday", Bound::Start),
            Err(AppError::BadRequest(_))
        );
    }

    #[test]
    fn all_and_blank_filters_are_dropped() {
        assert_eq!(filter_value(Some("all".into())), None);
        assert_eq!(filter_value(Some("  ".into())), None);
        assert_eq!(filter_value(Some(" login ".into())), Some("login".into()));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let log = AuditLog {
            id: Uuid::nil(),
            timestamp: Utc::now(),
            user_id: None,
            user_email: None,
            action: "update".into(),
            resource_type: Some("role".into()),
            resource_id: None,
            details: Some(json!({ "a": 1, "b": 2 })),
            status: "success".into(),
            ip_address: None,
            user_agent: Some("Mozilla/5.0 (X11, Linux)".into()),
        };
        let csv = render_csv(&[log]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("\"Mozilla/5.0 (X11, Linux)\""));
        assert!(row.ends_with("\"{\"\"a\"\":1,\"\"b\"\":2}\""));
    }
}
