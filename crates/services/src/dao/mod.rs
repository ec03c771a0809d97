pub mod activity_log;
pub mod attendance;
pub mod base;
pub mod project;
pub mod task;
pub mod user;
pub mod workspace;

pub use base::BaseDao;
