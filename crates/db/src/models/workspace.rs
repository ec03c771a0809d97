use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// Always matches the single membership holding `MemberRole::Owner`.
    /// Moved only by ownership transfer.
    pub owner_id: ObjectId,
    /// Human-shareable join code, unique across workspaces.
    pub invite_code: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

impl Workspace {
    pub const COLLECTION: &'static str = "workspaces";

    pub const INVITE_CODE_LEN: usize = 10;
}
