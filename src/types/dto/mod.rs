// Request/response shapes of the HTTP surface
pub mod auth;
pub mod common;
pub mod permission;
pub mod role;
pub mod user;
