use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Monthly counter of retroactive attendance edits per admin per
/// workspace. Keyed by the month the rectification is performed in,
/// not the month of the attendance date being corrected. Created
/// lazily on first consumption; `count` only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectificationEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub user_id: ObjectId,
    /// Zero-based calendar month, 0 = January.
    pub month: u32,
    pub year: i32,
    pub count: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl RectificationEntry {
    pub const COLLECTION: &'static str = "rectification_entries";

    /// Cap on rectifications per admin per workspace per calendar month.
    pub const MONTHLY_LIMIT: i64 = 3;
}
