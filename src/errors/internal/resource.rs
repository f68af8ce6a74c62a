use thiserror::Error;

/// Referenced entity does not exist (HTTP 404)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{resource} not found")]
    NotFound { resource: String },
}

impl ResourceError {
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
        }
    }

    pub fn user() -> Self {
        Self::not_found("User")
    }

    pub fn role() -> Self {
        Self::not_found("Role")
    }

    pub fn permission() -> Self {
        Self::not_found("Permission")
    }

    /// The acting user referenced by a create/update/delete no longer exists
    pub fn actor(role_in_operation: &str) -> Self {
        Self::not_found(&format!("{} user", role_in_operation))
    }
}
