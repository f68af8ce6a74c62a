pub mod auth;
pub mod bulk;
pub mod context;
pub mod query;
pub mod rbac;
pub mod snapshot;
pub mod user_update;
