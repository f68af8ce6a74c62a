use poem_openapi::Object;

use crate::errors::internal::{FieldViolation, ValidationError};
use crate::types::db::permission;
use crate::types::dto::common::rfc3339;
use crate::types::internal::rbac::{PermissionAction, PermissionModule};

/// Create and update share one shape
#[derive(Object, Debug, Clone)]
#[oai(deny_unknown_fields)]
pub struct PermissionRequest {
    /// Dotted name, e.g. `tour.read`
    pub name: String,
    pub module: PermissionModule,
    pub action: PermissionAction,
    pub description: Option<String>,
}

impl PermissionRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        let mut violations = Vec::new();
        if name.is_empty() {
            violations.push(FieldViolation::new("name", "Name is required"));
        } else if name.chars().count() > 100 {
            violations.push(FieldViolation::new("name", "Name must not exceed 100 characters"));
        }
        ValidationError::check(violations)
    }
}

#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct PermissionDto {
    pub id: i32,
    pub name: String,
    pub module: String,
    pub action: String,
    #[oai(skip_serializing_if_is_none)]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&permission::Model> for PermissionDto {
    fn from(model: &permission::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            module: model.module.clone(),
            action: model.action.clone(),
            description: model.description.clone(),
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}
