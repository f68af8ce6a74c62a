// Stores layer - Data access and repository pattern
//
// Every method takes `conn: &impl ConnectionTrait` so the same query runs on
// the pool or inside a coordinator's transaction.
pub mod permission_store;
pub mod role_store;
pub mod user_store;

pub use permission_store::PermissionStore;
pub use role_store::RoleStore;
pub use user_store::{NewUser, UserStore};
