use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// One attendance status per `(workspace, user, date)`. The date is a
/// canonical UTC start-of-day instant. A missing record reads as
/// [`AttendanceStatus::Absent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub user_id: ObjectId,
    pub date: DateTime,
    pub status: AttendanceStatus,
    pub marked_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    #[default]
    Absent,
    Leave,
}

impl AttendanceStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "leave" => Some(Self::Leave),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Leave => "leave",
        }
    }
}

impl AttendanceRecord {
    pub const COLLECTION: &'static str = "attendance_records";
}
