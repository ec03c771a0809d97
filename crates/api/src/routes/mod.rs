pub mod activity;
pub mod attendance;
pub mod auth;
pub mod member;
pub mod project;
pub mod task;
pub mod workspace;
