use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMember {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub user_id: ObjectId,
    pub role: MemberRole,
    pub invited_by: Option<ObjectId>,
    pub joined_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// The acting authority for every in-workspace operation.
///
/// `Owner` is a first-class role value: assigned exactly once when the
/// workspace is created and moved exactly once per ownership transfer.
/// It is never a valid target for a plain role change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Manager,
    Member,
}

impl MemberRole {
    /// Parses a role name from client input. `Owner` is deliberately not
    /// accepted here; ownership moves only via transfer.
    pub fn parse_assignable(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
        }
    }
}

impl WorkspaceMember {
    pub const COLLECTION: &'static str = "workspace_members";
}
