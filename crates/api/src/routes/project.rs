use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use crewdesk_db::models::{MemberRole, Project};
use crewdesk_services::access::authorize;
use crewdesk_services::activity::ActivityEvent;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    extractors::workspace::WorkspaceScope,
    state::AppState,
};

const WRITERS: [MemberRole; 2] = [MemberRole::Admin, MemberRole::Manager];

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl ProjectResponse {
    fn from_project(project: &Project) -> Self {
        Self {
            id: project.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: project.name.clone(),
            description: project.description.clone(),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    scope: WorkspaceScope,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.projects.list(scope.0.workspace_id()).await?;
    Ok(Json(
        projects.iter().map(ProjectResponse::from_project).collect(),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    authorize(scope.0.role(), &WRITERS)?;

    let workspace_id = scope.0.workspace_id();
    let project = state
        .projects
        .create(workspace_id, body.name, body.description, scope.0.user_id())
        .await?;

    if let Some(project_id) = project.id {
        state.activity.record(
            ActivityEvent::new(workspace_id, scope.0.user_id(), "project.created", "project")
                .entity(project_id),
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse::from_project(&project)),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Path((_, project_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    authorize(scope.0.role(), &WRITERS)?;

    let project_id = ObjectId::parse_str(&project_id)
        .map_err(|_| ApiError::BadRequest("Invalid project_id".to_string()))?;
    let workspace_id = scope.0.workspace_id();

    if !state.projects.delete(workspace_id, project_id).await? {
        return Err(ApiError::NotFound("No such project".to_string()));
    }

    state.activity.record(
        ActivityEvent::new(workspace_id, scope.0.user_id(), "project.deleted", "project")
            .entity(project_id),
    );

    Ok(StatusCode::NO_CONTENT)
}
