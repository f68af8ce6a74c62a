// Coordinators layer - Workflow orchestration
//
// Coordinators handle workflow orchestration by composing stores, providers
// and the cache for specific API endpoints. Each mutating workflow runs as a
// single transaction and touches the cache only after commit.

pub mod auth_coordinator;
pub mod permission_coordinator;
pub mod role_coordinator;
pub mod transaction;
pub mod user_coordinator;

// Re-export coordinators for clean imports
pub use auth_coordinator::AuthCoordinator;
pub use permission_coordinator::PermissionCoordinator;
pub use role_coordinator::RoleCoordinator;
pub use user_coordinator::UserCoordinator;
