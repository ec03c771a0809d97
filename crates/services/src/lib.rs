pub mod access;
pub mod activity;
pub mod auth;
pub mod cache;
pub mod dao;

pub use access::{AccessError, WorkspaceContext};
pub use activity::{ActivityEvent, ActivityLogger, ActivitySink};
pub use auth::AuthService;
pub use cache::CacheService;
pub use dao::*;
