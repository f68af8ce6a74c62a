use thiserror::Error;

use super::PasswordValidationError;

/// Rejected input or violated business constraint (HTTP 400, `Conflict` is 409)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Role already exists")]
    RoleNameTaken,

    #[error("Permission already exists")]
    PermissionNameTaken,

    #[error("At least one role is required")]
    RoleRequired,

    /// Some requested ids did not resolve; `entity` is plural ("Roles", "Permissions")
    #[error("{entity} not found: {}", join_ids(ids))]
    MissingReferences { entity: String, ids: Vec<i32> },

    #[error(transparent)]
    WeakPassword(#[from] PasswordValidationError),

    #[error("At least one user id is required")]
    EmptyBatch,

    #[error("Bulk operations are limited to {max} users")]
    BatchTooLarge { max: usize },

    #[error("Cannot delete role that has users assigned")]
    RoleInUse,

    #[error("Cannot delete permission assigned to roles")]
    PermissionInUse,

    #[error("Resource already exists")]
    Conflict,
}

impl RequestError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn missing_references(entity: &str, mut ids: Vec<i32>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self::MissingReferences {
            entity: entity.to_string(),
            ids,
        }
    }
}

fn join_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_references_lists_sorted_unique_ids() {
        let err = RequestError::missing_references("Roles", vec![9, 2, 9]);
        assert_eq!(err.to_string(), "Roles not found: 2, 9");
    }

    #[test]
    fn test_weak_password_message_passes_through() {
        let err = RequestError::from(PasswordValidationError::MissingUppercase);
        assert_eq!(
            err.to_string(),
            "Password must contain at least one uppercase letter"
        );
    }
}
