use axum::{Json, extract::State, http::StatusCode};
use bson::doc;
use crewdesk_db::models::{TaskStatus, Workspace};
use crewdesk_services::access::guard_owner_only;
use crewdesk_services::activity::ActivityEvent;
use crewdesk_services::dao::attendance::canonical_day;
use crewdesk_services::dao::base::DaoError;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, workspace::WorkspaceScope},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinWorkspaceRequest {
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferOwnershipRequest {
    pub new_owner_id: String,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub invite_code: String,
}

impl WorkspaceResponse {
    fn from_workspace(workspace: &Workspace) -> Self {
        Self {
            id: workspace.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: workspace.name.clone(),
            description: workspace.description.clone(),
            owner_id: workspace.owner_id.to_hex(),
            invite_code: workspace.invite_code.clone(),
        }
    }
}

/// Aggregate counts, served through the read-through cache.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct WorkspaceSummary {
    pub members: u64,
    pub tasks_total: u64,
    pub tasks_todo: u64,
    pub tasks_in_progress: u64,
    pub tasks_done: u64,
    pub present_today: u64,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<WorkspaceResponse>>, ApiError> {
    let workspaces = state.workspaces.find_user_workspaces(auth.user_id).await?;
    Ok(Json(
        workspaces
            .iter()
            .map(WorkspaceResponse::from_workspace)
            .collect(),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceResponse>), ApiError> {
    let workspace = state
        .workspaces
        .create(body.name, body.description, auth.user_id)
        .await?;

    if let Some(workspace_id) = workspace.id {
        state.activity.record(
            ActivityEvent::new(workspace_id, auth.user_id, "workspace.created", "workspace")
                .entity(workspace_id),
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(WorkspaceResponse::from_workspace(&workspace)),
    ))
}

pub async fn get(scope: WorkspaceScope) -> Json<WorkspaceResponse> {
    Json(WorkspaceResponse::from_workspace(&scope.0.workspace))
}

pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<JoinWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>, ApiError> {
    let workspace = state
        .workspaces
        .find_by_invite_code(&body.invite_code)
        .await
        .map_err(|_| ApiError::NotFound("Unknown invite code".to_string()))?;
    let workspace_id = workspace
        .id
        .ok_or_else(|| ApiError::Internal("Workspace has no id".to_string()))?;

    state
        .workspaces
        .add_member(
            workspace_id,
            auth.user_id,
            crewdesk_db::models::MemberRole::Member,
            None,
        )
        .await
        .map_err(|e| match e {
            DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Already a member of this workspace".to_string())
            }
            other => other.into(),
        })?;

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    state.activity.record(
        ActivityEvent::new(workspace_id, auth.user_id, "member.joined", "member")
            .entity(auth.user_id),
    );

    Ok(Json(WorkspaceResponse::from_workspace(&workspace)))
}

pub async fn summary(
    State(state): State<AppState>,
    scope: WorkspaceScope,
) -> Result<Json<WorkspaceSummary>, ApiError> {
    let workspace_id = scope.0.workspace_id();
    let key = AppState::summary_cache_key(&workspace_id);
    let ttl = state.settings.cache.summary_ttl_secs;

    let workspaces = state.workspaces.clone();
    let tasks = state.tasks.clone();
    let attendance = state.attendance.clone();

    let summary = state
        .cache
        .read_through(&key, ttl, || async move {
            let members = workspaces.member_count(workspace_id).await?;
            let tasks_todo = tasks.count_by_status(workspace_id, TaskStatus::Todo).await?;
            let tasks_in_progress = tasks
                .count_by_status(workspace_id, TaskStatus::InProgress)
                .await?;
            let tasks_done = tasks.count_by_status(workspace_id, TaskStatus::Done).await?;
            let today = chrono::Utc::now().date_naive();
            let present_today = attendance
                .records
                .count(doc! {
                    "workspace_id": workspace_id,
                    "date": canonical_day(today),
                    "status": "present",
                })
                .await?;

            Ok::<_, DaoError>(Some(WorkspaceSummary {
                members,
                tasks_total: tasks_todo + tasks_in_progress + tasks_done,
                tasks_todo,
                tasks_in_progress,
                tasks_done,
                present_today,
            }))
        })
        .await?
        .ok_or_else(|| ApiError::Internal("Summary loader returned nothing".to_string()))?;

    Ok(Json(summary))
}

pub async fn transfer_ownership(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Json(body): Json<TransferOwnershipRequest>,
) -> Result<Json<WorkspaceResponse>, ApiError> {
    guard_owner_only(&scope.0)?;

    let new_owner_id = bson::oid::ObjectId::parse_str(&body.new_owner_id)
        .map_err(|_| ApiError::BadRequest("Invalid new_owner_id".to_string()))?;
    let workspace_id = scope.0.workspace_id();

    // The new owner must already be a member.
    state
        .workspaces
        .find_membership(workspace_id, new_owner_id)
        .await?
        .ok_or(crewdesk_services::AccessError::NotAMember)?;

    state
        .workspaces
        .transfer_ownership(workspace_id, new_owner_id)
        .await?;

    state.activity.record(
        ActivityEvent::new(
            workspace_id,
            scope.0.user_id(),
            "workspace.ownership_transferred",
            "workspace",
        )
        .entity(workspace_id)
        .metadata(doc! { "new_owner_id": new_owner_id }),
    );

    let workspace = state
        .workspaces
        .find_active(workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workspace not found".to_string()))?;
    Ok(Json(WorkspaceResponse::from_workspace(&workspace)))
}

pub async fn delete(
    State(state): State<AppState>,
    scope: WorkspaceScope,
) -> Result<StatusCode, ApiError> {
    guard_owner_only(&scope.0)?;

    let workspace_id = scope.0.workspace_id();
    state.workspaces.delete_workspace(workspace_id).await?;

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    state.activity.record(
        ActivityEvent::new(
            workspace_id,
            scope.0.user_id(),
            "workspace.deleted",
            "workspace",
        )
        .entity(workspace_id),
    );

    Ok(StatusCode::NO_CONTENT)
}
