use bson::{doc, oid::ObjectId, DateTime, Document};
use crewdesk_db::models::{Task, TaskPriority, TaskStatus};
use mongodb::Database;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

pub struct TaskDao {
    pub base: BaseDao<Task>,
}

pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<ObjectId>,
    pub due_date: Option<DateTime>,
}

impl TaskDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Task::COLLECTION),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        workspace_id: ObjectId,
        project_id: Option<ObjectId>,
        title: String,
        description: Option<String>,
        priority: TaskPriority,
        assignee_id: Option<ObjectId>,
        due_date: Option<DateTime>,
        created_by: ObjectId,
    ) -> DaoResult<Task> {
        let now = DateTime::now();
        let task = Task {
            id: None,
            workspace_id,
            project_id,
            title,
            description,
            status: TaskStatus::Todo,
            priority,
            assignee_id,
            due_date,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&task).await?;
        self.base.find_by_id(id).await
    }

    pub async fn list(
        &self,
        workspace_id: ObjectId,
        status: Option<TaskStatus>,
        assignee_id: Option<ObjectId>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Task>> {
        let mut filter = doc! { "workspace_id": workspace_id };
        if let Some(status) = status {
            filter.insert("status", bson::to_bson(&status)?);
        }
        if let Some(assignee_id) = assignee_id {
            filter.insert("assignee_id", assignee_id);
        }
        self.base
            .find_paginated(filter, Some(doc! { "created_at": -1 }), params)
            .await
    }

    pub async fn update(
        &self,
        workspace_id: ObjectId,
        task_id: ObjectId,
        update: TaskUpdate,
    ) -> DaoResult<Task> {
        let mut set = Document::new();
        if let Some(title) = update.title {
            set.insert("title", title);
        }
        if let Some(description) = update.description {
            set.insert("description", description);
        }
        if let Some(status) = update.status {
            set.insert("status", bson::to_bson(&status)?);
        }
        if let Some(priority) = update.priority {
            set.insert("priority", bson::to_bson(&priority)?);
        }
        if let Some(assignee_id) = update.assignee_id {
            set.insert("assignee_id", assignee_id);
        }
        if let Some(due_date) = update.due_date {
            set.insert("due_date", due_date);
        }

        if !set.is_empty() {
            self.base
                .update_one(
                    doc! { "_id": task_id, "workspace_id": workspace_id },
                    doc! { "$set": set },
                )
                .await?;
        }

        self.base.find_by_id_in_workspace(workspace_id, task_id).await
    }

    pub async fn delete(&self, workspace_id: ObjectId, task_id: ObjectId) -> DaoResult<bool> {
        let deleted = self
            .base
            .hard_delete(doc! { "_id": task_id, "workspace_id": workspace_id })
            .await?;
        Ok(deleted > 0)
    }

    pub async fn count_by_status(
        &self,
        workspace_id: ObjectId,
        status: TaskStatus,
    ) -> DaoResult<u64> {
        self.base
            .count(doc! {
                "workspace_id": workspace_id,
                "status": bson::to_bson(&status)?,
            })
            .await
    }
}
