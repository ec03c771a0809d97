use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bson::{doc, oid::ObjectId};
use crewdesk_db::models::WorkspaceMember;
use crewdesk_services::access::{guard_change_role, guard_remove_member};
use crewdesk_services::activity::ActivityEvent;
use crewdesk_services::dao::base::PaginationParams;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    extractors::workspace::WorkspaceScope,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: String,
}

impl MemberResponse {
    fn from_member(member: &WorkspaceMember) -> Self {
        Self {
            id: member.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: member.user_id.to_hex(),
            role: member.role.as_str().to_string(),
            joined_at: member.joined_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

pub async fn list(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Query(params): Query<PaginationParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = state
        .workspaces
        .members
        .find_paginated(
            doc! { "workspace_id": scope.0.workspace_id() },
            Some(doc! { "joined_at": 1 }),
            &params,
        )
        .await?;

    let items: Vec<MemberResponse> = result.items.iter().map(MemberResponse::from_member).collect();

    Ok(Json(serde_json::json!({
        "items": items,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page,
        "total_pages": result.total_pages,
    })))
}

async fn target_member(
    state: &AppState,
    scope: &WorkspaceScope,
    user_id: &str,
) -> Result<WorkspaceMember, ApiError> {
    let target_id = ObjectId::parse_str(user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;
    state
        .workspaces
        .find_membership(scope.0.workspace_id(), target_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No such member".to_string()))
}

pub async fn change_role(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Path((_, user_id)): Path<(String, String)>,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let target = target_member(&state, &scope, &user_id).await?;
    let new_role = guard_change_role(&scope.0, &target, &body.role)?;

    let workspace_id = scope.0.workspace_id();
    state
        .workspaces
        .change_role(workspace_id, target.user_id, new_role)
        .await?;

    state.activity.record(
        ActivityEvent::new(workspace_id, scope.0.user_id(), "member.role_changed", "member")
            .entity(target.user_id)
            .metadata(doc! { "role": new_role.as_str() }),
    );

    let updated = state
        .workspaces
        .find_membership(workspace_id, target.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No such member".to_string()))?;
    Ok(Json(MemberResponse::from_member(&updated)))
}

pub async fn remove(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Path((_, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let target = target_member(&state, &scope, &user_id).await?;
    guard_remove_member(&scope.0, &target)?;

    let workspace_id = scope.0.workspace_id();
    state
        .workspaces
        .remove_member(workspace_id, target.user_id)
        .await?;

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    state.activity.record(
        ActivityEvent::new(workspace_id, scope.0.user_id(), "member.removed", "member")
            .entity(target.user_id),
    );

    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave(
    State(state): State<AppState>,
    scope: WorkspaceScope,
) -> Result<StatusCode, ApiError> {
    let target = scope.0.membership.clone();
    guard_remove_member(&scope.0, &target)?;

    let workspace_id = scope.0.workspace_id();
    state
        .workspaces
        .remove_member(workspace_id, target.user_id)
        .await?;

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    state.activity.record(
        ActivityEvent::new(workspace_id, scope.0.user_id(), "member.left", "member")
            .entity(target.user_id),
    );

    Ok(StatusCode::NO_CONTENT)
}
