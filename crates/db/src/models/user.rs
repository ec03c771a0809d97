use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Platform-wide role. Informational only: in-workspace authorization
    /// always comes from the membership role, never from this field.
    #[serde(default)]
    pub global_role: GlobalRole,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub last_active_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    Admin,
    #[default]
    User,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl User {
    pub const COLLECTION: &'static str = "users";
}
