use axum::{
    Json,
    extract::{Query, State},
};
use bson::oid::ObjectId;
use chrono::{NaiveDate, Utc};
use crewdesk_db::models::{AttendanceRecord, MemberRole};
use crewdesk_services::access::authorize;
use crewdesk_services::activity::ActivityEvent;
use crewdesk_services::dao::attendance::MarkAssignment;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    extractors::workspace::WorkspaceScope,
    state::AppState,
};

/// Roles allowed to mark attendance and inspect other members' records.
const ELEVATED: [MemberRole; 2] = [MemberRole::Admin, MemberRole::Manager];

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub entries: Vec<MarkAssignment>,
}

#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub applied: usize,
    pub rectifications: usize,
    pub remaining_attempts: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub user_id: String,
    pub date: String,
    pub status: String,
    pub marked_by: String,
}

impl AttendanceResponse {
    fn from_record(record: &AttendanceRecord) -> Self {
        Self {
            user_id: record.user_id.to_hex(),
            date: record
                .date
                .to_chrono()
                .date_naive()
                .format("%Y-%m-%d")
                .to_string(),
            status: record.status.as_str().to_string(),
            marked_by: record.marked_by.to_hex(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptsResponse {
    pub remaining_attempts: i64,
    pub monthly_limit: i64,
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("Invalid date: {value}")))
}

pub async fn mark(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Json(body): Json<MarkRequest>,
) -> Result<Json<MarkResponse>, ApiError> {
    authorize(scope.0.role(), &ELEVATED)?;

    if body.entries.is_empty() {
        return Err(ApiError::BadRequest("No entries to mark".to_string()));
    }

    let date = parse_date(&body.date)?;
    let workspace_id = scope.0.workspace_id();
    let actor_id = scope.0.user_id();

    let outcome = state
        .attendance
        .mark_batch(workspace_id, actor_id, date, &body.entries, Utc::now())
        .await?;

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    state.activity.record(
        ActivityEvent::new(workspace_id, actor_id, "attendance.marked", "attendance").metadata(
            bson::doc! {
                "date": &body.date,
                "applied": outcome.applied as i64,
                "rectifications": outcome.rectifications as i64,
            },
        ),
    );

    Ok(Json(MarkResponse {
        applied: outcome.applied,
        rectifications: outcome.rectifications,
        remaining_attempts: outcome.remaining,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AttendanceResponse>>, ApiError> {
    let target_id = match &query.user_id {
        Some(raw) => ObjectId::parse_str(raw)
            .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?,
        None => scope.0.user_id(),
    };

    // Anyone may read their own history; other members' history takes an
    // elevated role.
    if target_id != scope.0.user_id() {
        authorize(scope.0.role(), &ELEVATED)?;
    }

    let from = query.from.as_deref().map(parse_date).transpose()?;
    let to = query.to.as_deref().map(parse_date).transpose()?;

    let records = state
        .attendance
        .list_for_user(scope.0.workspace_id(), target_id, from, to)
        .await?;

    Ok(Json(
        records.iter().map(AttendanceResponse::from_record).collect(),
    ))
}

pub async fn attempts(
    State(state): State<AppState>,
    scope: WorkspaceScope,
) -> Result<Json<AttemptsResponse>, ApiError> {
    authorize(scope.0.role(), &ELEVATED)?;

    let remaining = state
        .attendance
        .remaining_attempts(scope.0.workspace_id(), scope.0.user_id(), Utc::now())
        .await?;

    Ok(Json(AttemptsResponse {
        remaining_attempts: remaining,
        monthly_limit: crewdesk_db::models::RectificationEntry::MONTHLY_LIMIT,
    }))
}
