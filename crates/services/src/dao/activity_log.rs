use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use crewdesk_db::models::ActivityLog;
use mongodb::Database;

use crate::activity::{ActivityEvent, ActivitySink};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

pub struct ActivityLogDao {
    pub base: BaseDao<ActivityLog>,
}

impl ActivityLogDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, ActivityLog::COLLECTION),
        }
    }

    pub async fn append(&self, event: &ActivityEvent) -> DaoResult<ObjectId> {
        let log = ActivityLog {
            id: None,
            workspace_id: event.workspace_id,
            user_id: event.user_id,
            action: event.action.clone(),
            entity_type: event.entity_type.clone(),
            entity_id: event.entity_id,
            metadata: event.metadata.clone(),
            created_at: DateTime::now(),
        };
        self.base.insert_one(&log).await
    }

    pub async fn list(
        &self,
        workspace_id: ObjectId,
        user_id: Option<ObjectId>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<ActivityLog>> {
        let mut filter = doc! { "workspace_id": workspace_id };
        if let Some(user_id) = user_id {
            filter.insert("user_id", user_id);
        }
        self.base
            .find_paginated(filter, Some(doc! { "created_at": -1 }), params)
            .await
    }
}

#[async_trait]
impl ActivitySink for ActivityLogDao {
    async fn persist(&self, event: &ActivityEvent) -> Result<(), DaoError> {
        self.append(event).await?;
        Ok(())
    }
}
