use axum::{
    Json,
    extract::{Query, State},
};
use bson::oid::ObjectId;
use crewdesk_db::models::{ActivityLog, MemberRole};
use crewdesk_services::access::authorize;
use crewdesk_services::dao::base::PaginationParams;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    extractors::workspace::WorkspaceScope,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub created_at: String,
}

impl ActivityResponse {
    fn from_log(log: &ActivityLog) -> Self {
        Self {
            id: log.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: log.user_id.to_hex(),
            action: log.action.clone(),
            entity_type: log.entity_type.clone(),
            entity_id: log.entity_id.map(|id| id.to_hex()),
            created_at: log.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(scope.0.role(), &[MemberRole::Admin])?;

    let user_id = query
        .user_id
        .as_deref()
        .map(|raw| {
            ObjectId::parse_str(raw)
                .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))
        })
        .transpose()?;

    let result = state
        .activity_logs
        .list(scope.0.workspace_id(), user_id, &query.pagination)
        .await?;

    let items: Vec<ActivityResponse> = result.items.iter().map(ActivityResponse::from_log).collect();

    Ok(Json(serde_json::json!({
        "items": items,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page,
        "total_pages": result.total_pages,
    })))
}
