use bson::{doc, oid::ObjectId, DateTime};
use crewdesk_db::models::Project;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

pub struct ProjectDao {
    pub base: BaseDao<Project>,
}

impl ProjectDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Project::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        workspace_id: ObjectId,
        name: String,
        description: Option<String>,
        created_by: ObjectId,
    ) -> DaoResult<Project> {
        let now = DateTime::now();
        let project = Project {
            id: None,
            workspace_id,
            name,
            description,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&project).await?;
        self.base.find_by_id(id).await
    }

    pub async fn list(&self, workspace_id: ObjectId) -> DaoResult<Vec<Project>> {
        self.base
            .find_many(
                doc! { "workspace_id": workspace_id },
                Some(doc! { "name": 1 }),
            )
            .await
    }

    pub async fn delete(&self, workspace_id: ObjectId, project_id: ObjectId) -> DaoResult<bool> {
        let deleted = self
            .base
            .hard_delete(doc! { "_id": project_id, "workspace_id": workspace_id })
            .await?;
        Ok(deleted > 0)
    }
}
