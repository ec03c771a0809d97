use crewdesk_config::Settings;
use crewdesk_services::{
    ActivityLogger, AuthService, CacheService,
    activity::ActivitySink,
    dao::{
        activity_log::ActivityLogDao, attendance::AttendanceDao, project::ProjectDao,
        task::TaskDao, user::UserDao, workspace::WorkspaceDao,
    },
};
use mongodb::Database;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub workspaces: Arc<WorkspaceDao>,
    pub projects: Arc<ProjectDao>,
    pub tasks: Arc<TaskDao>,
    pub attendance: Arc<AttendanceDao>,
    pub activity_logs: Arc<ActivityLogDao>,
    pub cache: CacheService,
    pub activity: ActivityLogger,
}

impl AppState {
    pub async fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let workspaces = Arc::new(WorkspaceDao::new(&db));
        let projects = Arc::new(ProjectDao::new(&db));
        let tasks = Arc::new(TaskDao::new(&db));
        let attendance = Arc::new(AttendanceDao::new(&db));
        let activity_logs = Arc::new(ActivityLogDao::new(&db));

        let cache = CacheService::connect(&settings.redis).await;
        let activity = ActivityLogger::start(
            Arc::clone(&activity_logs) as Arc<dyn ActivitySink>,
            &settings.activity,
        );

        Self {
            db,
            settings,
            auth,
            users,
            workspaces,
            projects,
            tasks,
            attendance,
            activity_logs,
            cache,
            activity,
        }
    }

    /// Versioned cache key for a workspace's aggregate summary.
    pub fn summary_cache_key(workspace_id: &bson::oid::ObjectId) -> String {
        CacheService::key(&["workspace", &workspace_id.to_hex(), "summary"])
    }
}
