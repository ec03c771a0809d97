pub mod activity_log;
pub mod attendance;
pub mod project;
pub mod rectification;
pub mod task;
pub mod user;
pub mod workspace;
pub mod workspace_member;

pub use activity_log::ActivityLog;
pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use project::Project;
pub use rectification::RectificationEntry;
pub use task::{Task, TaskPriority, TaskStatus};
pub use user::{GlobalRole, User};
pub use workspace::Workspace;
pub use workspace_member::{MemberRole, WorkspaceMember};
