use thiserror::Error;

/// Authorization gate and protected-entity rejections
///
/// `Unauthenticated` maps to HTTP 401, every other variant to 403.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Insufficient role privileges")]
    InsufficientRole,

    /// ALL mode: at least one of the listed permissions is absent
    #[error("Missing required permissions")]
    MissingPermissions,

    /// ANY mode: none of the listed permissions is present
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Cannot modify super admin user")]
    SuperadminModification,

    #[error("Cannot delete super admin user")]
    SuperadminDeletion,

    #[error("Cannot delete your own account")]
    SelfDeletion,

    #[error("Only superadmin can create system roles")]
    SystemRoleCreation,

    #[error("Only superadmin can modify system roles")]
    SystemRoleModification,

    #[error("Cannot delete system roles")]
    SystemRoleDeletion,
}
