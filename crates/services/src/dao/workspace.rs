use bson::{doc, oid::ObjectId, DateTime};
use crewdesk_db::models::{MemberRole, Project, Task, Workspace, WorkspaceMember};
use dashmap::DashMap;
use mongodb::Database;
use nanoid::nanoid;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::base::{BaseDao, DaoError, DaoResult};

fn new_invite_code() -> String {
    nanoid!({ Workspace::INVITE_CODE_LEN })
}

pub struct WorkspaceDao {
    pub base: BaseDao<Workspace>,
    pub members: BaseDao<WorkspaceMember>,
    projects: BaseDao<Project>,
    tasks: BaseDao<Task>,
    /// Per-workspace critical sections for the mutations that must apply
    /// more than one document change as a unit (ownership transfer).
    locks: DashMap<ObjectId, Arc<Mutex<()>>>,
}

impl WorkspaceDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Workspace::COLLECTION),
            members: BaseDao::new(db, WorkspaceMember::COLLECTION),
            projects: BaseDao::new(db, Project::COLLECTION),
            tasks: BaseDao::new(db, Task::COLLECTION),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, workspace_id: ObjectId) -> Arc<Mutex<()>> {
        self.locks
            .entry(workspace_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        owner_id: ObjectId,
    ) -> DaoResult<Workspace> {
        let now = DateTime::now();
        let workspace = Workspace {
            id: None,
            name,
            description,
            icon: None,
            owner_id,
            invite_code: new_invite_code(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let workspace_id = self.base.insert_one(&workspace).await?;

        // The creator is the one and only Owner membership.
        self.add_member(workspace_id, owner_id, MemberRole::Owner, None)
            .await?;

        self.base.find_by_id(workspace_id).await
    }

    pub async fn add_member(
        &self,
        workspace_id: ObjectId,
        user_id: ObjectId,
        role: MemberRole,
        invited_by: Option<ObjectId>,
    ) -> DaoResult<WorkspaceMember> {
        let now = DateTime::now();
        let member = WorkspaceMember {
            id: None,
            workspace_id,
            user_id,
            role,
            invited_by,
            joined_at: now,
            created_at: now,
            updated_at: now,
        };

        let id = self.members.insert_one(&member).await?;
        self.members.find_by_id(id).await
    }

    pub async fn find_active(&self, workspace_id: ObjectId) -> DaoResult<Option<Workspace>> {
        self.base
            .find_one(doc! { "_id": workspace_id, "deleted_at": null })
            .await
    }

    pub async fn find_by_invite_code(&self, code: &str) -> DaoResult<Workspace> {
        self.base
            .find_one(doc! { "invite_code": code, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_membership(
        &self,
        workspace_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Option<WorkspaceMember>> {
        self.members
            .find_one(doc! { "workspace_id": workspace_id, "user_id": user_id })
            .await
    }

    pub async fn find_user_workspaces(&self, user_id: ObjectId) -> DaoResult<Vec<Workspace>> {
        let memberships = self
            .members
            .find_many(doc! { "user_id": user_id }, None)
            .await?;

        let workspace_ids: Vec<ObjectId> = memberships.iter().map(|m| m.workspace_id).collect();

        if workspace_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.base
            .find_many(
                doc! { "_id": { "$in": workspace_ids }, "deleted_at": null },
                Some(doc! { "name": 1 }),
            )
            .await
    }

    pub async fn change_role(
        &self,
        workspace_id: ObjectId,
        user_id: ObjectId,
        role: MemberRole,
    ) -> DaoResult<bool> {
        self.members
            .update_one(
                doc! { "workspace_id": workspace_id, "user_id": user_id },
                doc! { "$set": { "role": role.as_str() } },
            )
            .await
    }

    pub async fn remove_member(
        &self,
        workspace_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<bool> {
        let deleted = self
            .members
            .hard_delete(doc! { "workspace_id": workspace_id, "user_id": user_id })
            .await?;
        Ok(deleted > 0)
    }

    /// Moves ownership to an existing member. The workspace owner pointer,
    /// the new owner's promotion and the old owner's demotion to Admin are
    /// applied under the workspace's critical section so no interleaved
    /// mutation can observe a half-transferred state.
    pub async fn transfer_ownership(
        &self,
        workspace_id: ObjectId,
        new_owner_id: ObjectId,
    ) -> DaoResult<()> {
        let lock = self.lock_for(workspace_id);
        let _guard = lock.lock().await;

        let workspace = self
            .find_active(workspace_id)
            .await?
            .ok_or(DaoError::NotFound)?;
        let previous_owner_id = workspace.owner_id;

        // The new owner must already hold a membership.
        self.find_membership(workspace_id, new_owner_id)
            .await?
            .ok_or(DaoError::NotFound)?;

        if previous_owner_id == new_owner_id {
            return Ok(());
        }

        self.base
            .update_by_id(workspace_id, doc! { "$set": { "owner_id": new_owner_id } })
            .await?;
        self.change_role(workspace_id, new_owner_id, MemberRole::Owner)
            .await?;
        self.change_role(workspace_id, previous_owner_id, MemberRole::Admin)
            .await?;

        info!(%workspace_id, %previous_owner_id, %new_owner_id, "Ownership transferred");
        Ok(())
    }

    /// Soft-deletes the workspace and cascades to memberships, projects
    /// and tasks. Attendance, rectification and activity records are
    /// retained as audit history.
    pub async fn delete_workspace(&self, workspace_id: ObjectId) -> DaoResult<()> {
        let lock = self.lock_for(workspace_id);
        let _guard = lock.lock().await;

        self.base.soft_delete(workspace_id).await?;

        let members = self
            .members
            .hard_delete(doc! { "workspace_id": workspace_id })
            .await?;
        let projects = self
            .projects
            .hard_delete(doc! { "workspace_id": workspace_id })
            .await?;
        let tasks = self
            .tasks
            .hard_delete(doc! { "workspace_id": workspace_id })
            .await?;

        info!(%workspace_id, members, projects, tasks, "Workspace deleted");
        Ok(())
    }

    pub async fn member_count(&self, workspace_id: ObjectId) -> DaoResult<u64> {
        self.members
            .count(doc! { "workspace_id": workspace_id })
            .await
    }
}
