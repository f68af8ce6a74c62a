use poem_openapi::Object;

use crate::errors::internal::{FieldViolation, ValidationError};
use crate::types::dto::common::rfc3339;
use crate::types::dto::permission::PermissionDto;
use crate::types::internal::snapshot::RoleSnapshot;

#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    #[oai(default)]
    pub is_system: bool,
    #[oai(default)]
    pub permission_ids: Vec<i32>,
}

/// Partial role update; `permissionIds` replaces the permission set when present
#[derive(Object, Debug, Clone, Default)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
}

fn check_permission_ids(violations: &mut Vec<FieldViolation>, ids: &[i32]) {
    if ids.iter().any(|id| *id <= 0) {
        violations.push(FieldViolation::new(
            "permissionIds",
            "Permission IDs must be positive integers",
        ));
    }
}

impl CreateRoleRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        check_permission_ids(&mut violations, &self.permission_ids);
        ValidationError::check(violations)
    }
}

impl UpdateRoleRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        if let Some(ids) = &self.permission_ids {
            if ids.is_empty() {
                violations.push(FieldViolation::new(
                    "permissionIds",
                    "Permission IDs cannot be empty",
                ));
            }
            check_permission_ids(&mut violations, ids);
        }
        ValidationError::check(violations)
    }
}

#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct RoleDto {
    pub id: i32,
    pub name: String,
    #[oai(skip_serializing_if_is_none)]
    pub description: Option<String>,
    pub is_system: bool,
    pub permissions: Vec<PermissionDto>,
    pub user_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&RoleSnapshot> for RoleDto {
    fn from(snapshot: &RoleSnapshot) -> Self {
        Self {
            id: snapshot.role.id,
            name: snapshot.role.name.clone(),
            description: snapshot.role.description.clone(),
            is_system: snapshot.role.is_system,
            permissions: snapshot.permissions.iter().map(PermissionDto::from).collect(),
            user_count: snapshot.user_count,
            created_at: rfc3339(snapshot.role.created_at),
            updated_at: rfc3339(snapshot.role.updated_at),
        }
    }
}
