use bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Append-only audit record. Written only by the activity pipeline
/// consumer, never directly from a request handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub user_id: ObjectId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<ObjectId>,
    #[serde(default)]
    pub metadata: Document,
    pub created_at: DateTime,
}

impl ActivityLog {
    pub const COLLECTION: &'static str = "activity_logs";
}
