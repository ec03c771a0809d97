use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use crewdesk_db::models::{MemberRole, Task, TaskPriority, TaskStatus};
use crewdesk_services::access::authorize;
use crewdesk_services::activity::ActivityEvent;
use crewdesk_services::dao::base::PaginationParams;
use crewdesk_services::dao::task::TaskUpdate;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    extractors::workspace::WorkspaceScope,
    state::AppState,
};

const WRITERS: [MemberRole; 2] = [MemberRole::Admin, MemberRole::Manager];

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub assignee_id: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
}

impl TaskResponse {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            project_id: task.project_id.map(|id| id.to_hex()),
            assignee_id: task.assignee_id.map(|id| id.to_hex()),
        }
    }
}

fn parse_object_id(value: &str, field: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

fn parse_due_date(value: &str) -> Result<bson::DateTime, ApiError> {
    let date = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid due_date: {value}")))?;
    Ok(crewdesk_services::dao::attendance::canonical_day(date))
}

pub async fn list(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            TaskStatus::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("Invalid status: {raw}")))
        })
        .transpose()?;
    let assignee_id = query
        .assignee_id
        .as_deref()
        .map(|raw| parse_object_id(raw, "assignee_id"))
        .transpose()?;

    let result = state
        .tasks
        .list(scope.0.workspace_id(), status, assignee_id, &query.pagination)
        .await?;

    let items: Vec<TaskResponse> = result.items.iter().map(TaskResponse::from_task).collect();

    Ok(Json(serde_json::json!({
        "items": items,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page,
        "total_pages": result.total_pages,
    })))
}

pub async fn create(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    authorize(scope.0.role(), &WRITERS)?;

    let priority = match body.priority.as_deref() {
        Some(raw) => TaskPriority::parse(raw)
            .ok_or_else(|| ApiError::Validation(format!("Invalid priority: {raw}")))?,
        None => TaskPriority::default(),
    };
    let project_id = body
        .project_id
        .as_deref()
        .map(|raw| parse_object_id(raw, "project_id"))
        .transpose()?;
    let assignee_id = body
        .assignee_id
        .as_deref()
        .map(|raw| parse_object_id(raw, "assignee_id"))
        .transpose()?;
    let due_date = body.due_date.as_deref().map(parse_due_date).transpose()?;

    let workspace_id = scope.0.workspace_id();
    let task = state
        .tasks
        .create(
            workspace_id,
            project_id,
            body.title,
            body.description,
            priority,
            assignee_id,
            due_date,
            scope.0.user_id(),
        )
        .await?;

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    if let Some(task_id) = task.id {
        state.activity.record(
            ActivityEvent::new(workspace_id, scope.0.user_id(), "task.created", "task")
                .entity(task_id),
        );
    }

    Ok((StatusCode::CREATED, Json(TaskResponse::from_task(&task))))
}

pub async fn update(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Path((_, task_id)): Path<(String, String)>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    authorize(scope.0.role(), &WRITERS)?;

    let task_id = parse_object_id(&task_id, "task_id")?;
    let status = body
        .status
        .as_deref()
        .map(|raw| {
            TaskStatus::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("Invalid status: {raw}")))
        })
        .transpose()?;
    let priority = body
        .priority
        .as_deref()
        .map(|raw| {
            TaskPriority::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("Invalid priority: {raw}")))
        })
        .transpose()?;
    let assignee_id = body
        .assignee_id
        .as_deref()
        .map(|raw| parse_object_id(raw, "assignee_id"))
        .transpose()?;
    let due_date = body.due_date.as_deref().map(parse_due_date).transpose()?;

    let workspace_id = scope.0.workspace_id();
    let task = state
        .tasks
        .update(
            workspace_id,
            task_id,
            TaskUpdate {
                title: body.title,
                description: body.description,
                status,
                priority,
                assignee_id,
                due_date,
            },
        )
        .await?;

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    state.activity.record(
        ActivityEvent::new(workspace_id, scope.0.user_id(), "task.updated", "task")
            .entity(task_id),
    );

    Ok(Json(TaskResponse::from_task(&task)))
}

pub async fn delete(
    State(state): State<AppState>,
    scope: WorkspaceScope,
    Path((_, task_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    authorize(scope.0.role(), &WRITERS)?;

    let task_id = parse_object_id(&task_id, "task_id")?;
    let workspace_id = scope.0.workspace_id();

    if !state.tasks.delete(workspace_id, task_id).await? {
        return Err(ApiError::NotFound("No such task".to_string()));
    }

    state
        .cache
        .invalidate(&AppState::summary_cache_key(&workspace_id))
        .await;
    state.activity.record(
        ActivityEvent::new(workspace_id, scope.0.user_id(), "task.deleted", "task")
            .entity(task_id),
    );

    Ok(StatusCode::NO_CONTENT)
}
