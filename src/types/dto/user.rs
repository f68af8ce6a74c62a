use poem_openapi::Object;
use poem_openapi::types::MaybeUndefined;

use crate::errors::internal::{FieldViolation, ValidationError};
use crate::types::dto::common::rfc3339;
use crate::types::internal::bulk::{BulkItemError, BulkOutcome};
use crate::types::internal::snapshot::{UserSnapshot, UserStatus, status_of};
use crate::types::internal::user_update::{UserField, UserUpdate};
use crate::types::db::user;

const NAME_MAX: usize = 50;
const DISPLAY_NAME_MAX: usize = 100;
const PHONE_MAX: usize = 20;

fn check_max(violations: &mut Vec<FieldViolation>, field: &str, label: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            violations.push(FieldViolation::new(
                field,
                format!("{} must not exceed {} characters", label, max),
            ));
        }
    }
}

/// Request model for creating a user; the password is generated server-side
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    /// At least one role id
    pub role_ids: Vec<i32>,
    /// Ask for out-of-band delivery of the generated password
    #[oai(default)]
    pub send_password_email: bool,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        if self.first_name.trim().is_empty() {
            violations.push(FieldViolation::new("firstName", "First name is required"));
        }
        if self.last_name.trim().is_empty() {
            violations.push(FieldViolation::new("lastName", "Last name is required"));
        }
        check_max(&mut violations, "firstName", "First name", Some(&self.first_name), NAME_MAX);
        check_max(&mut violations, "lastName", "Last name", Some(&self.last_name), NAME_MAX);
        check_max(&mut violations, "displayName", "Display name", self.display_name.as_deref(), DISPLAY_NAME_MAX);
        check_max(&mut violations, "phone", "Phone", self.phone.as_deref(), PHONE_MAX);
        if self.role_ids.is_empty() {
            violations.push(FieldViolation::new("roleIds", "At least one role is required"));
        }
        ValidationError::check(violations)
    }
}

/// Partial update; omitted fields are left untouched, `null` clears a profile field
#[derive(Object, Debug, Clone, Default)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub first_name: MaybeUndefined<String>,
    pub last_name: MaybeUndefined<String>,
    pub display_name: MaybeUndefined<String>,
    pub phone: MaybeUndefined<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    /// Replaces the full role set when present
    pub role_ids: Option<Vec<i32>>,
}

fn nullable(value: &MaybeUndefined<String>) -> Option<Option<String>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(v) => Some(Some(v.clone())),
    }
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        check_max(&mut violations, "firstName", "First name", self.first_name.value().map(String::as_str), NAME_MAX);
        check_max(&mut violations, "lastName", "Last name", self.last_name.value().map(String::as_str), NAME_MAX);
        check_max(&mut violations, "displayName", "Display name", self.display_name.value().map(String::as_str), DISPLAY_NAME_MAX);
        check_max(&mut violations, "phone", "Phone", self.phone.value().map(String::as_str), PHONE_MAX);
        if matches!(&self.role_ids, Some(ids) if ids.is_empty()) {
            violations.push(FieldViolation::new("roleIds", "At least one role is required"));
        }
        ValidationError::check(violations)
    }

    pub fn into_update(self) -> UserUpdate {
        let mut update = UserUpdate::new();
        if let Some(v) = nullable(&self.first_name) {
            update = update.set(UserField::FirstName(v));
        }
        if let Some(v) = nullable(&self.last_name) {
            update = update.set(UserField::LastName(v));
        }
        if let Some(v) = nullable(&self.display_name) {
            update = update.set(UserField::DisplayName(v));
        }
        if let Some(v) = nullable(&self.phone) {
            update = update.set(UserField::Phone(v));
        }
        if let Some(v) = self.email {
            update = update.set(UserField::Email(v));
        }
        if let Some(v) = self.is_active {
            update = update.set(UserField::IsActive(v));
        }
        if let Some(v) = self.is_verified {
            update = update.set(UserField::IsVerified(v));
        }
        if let Some(ids) = self.role_ids {
            update = update.with_roles(ids);
        }
        update
    }
}

#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// Same update applied to each listed user
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkUpdateRequest {
    pub user_ids: Vec<i32>,
    pub update: UpdateUserRequest,
}

#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct RoleSummaryDto {
    pub id: i32,
    pub name: String,
    #[oai(skip_serializing_if_is_none)]
    pub description: Option<String>,
}

/// Sanitized user; the password hash never leaves the service
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_locked: bool,
    pub status: UserStatus,
    pub login_attempts: i32,
    pub last_login_at: Option<String>,
    pub roles: Vec<RoleSummaryDto>,
    pub permissions: Vec<String>,
    /// Id of the creating user, if still present
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

fn full_name(model: &user::Model) -> String {
    format!(
        "{} {}",
        model.first_name.as_deref().unwrap_or_default(),
        model.last_name.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string()
}

impl UserDto {
    /// Row-only rendering, used where roles are not loaded
    pub fn from_model(model: &user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            email: model.email.clone(),
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            display_name: model.display_name.clone(),
            full_name: full_name(model),
            phone: model.phone.clone(),
            avatar_url: model.avatar_url.clone(),
            is_active: model.is_active,
            is_verified: model.is_verified,
            is_locked: model.is_locked,
            status: status_of(model),
            login_attempts: model.login_attempts,
            last_login_at: model.last_login_at.map(rfc3339),
            roles: Vec::new(),
            permissions: Vec::new(),
            created_by: model.created_by,
            updated_by: model.updated_by,
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

impl From<&UserSnapshot> for UserDto {
    fn from(snapshot: &UserSnapshot) -> Self {
        let mut dto = Self::from_model(&snapshot.user);
        dto.roles = snapshot
            .roles
            .iter()
            .map(|grant| RoleSummaryDto {
                id: grant.role.id,
                name: grant.role.name.clone(),
                description: grant.role.description.clone(),
            })
            .collect();
        dto.permissions = snapshot.effective_permissions().into_iter().collect();
        dto
    }
}

#[derive(Object, Debug, Clone)]
pub struct BulkItemErrorDto {
    pub id: i32,
    pub error: String,
}

#[derive(Object, Debug, Clone)]
pub struct BulkOutcomeDto {
    pub success: u64,
    pub failed: u64,
    pub errors: Vec<BulkItemErrorDto>,
}

impl From<BulkOutcome> for BulkOutcomeDto {
    fn from(outcome: BulkOutcome) -> Self {
        Self {
            success: outcome.success as u64,
            failed: outcome.failed as u64,
            errors: outcome
                .errors
                .into_iter()
                .map(|BulkItemError { id, error }| BulkItemErrorDto { id, error })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::snapshot::fixtures;

    fn create_request() -> CreateUserRequest {
        CreateUserRequest {
            username: "john_doe".to_string(),
            email: "john@example.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            display_name: None,
            phone: None,
            role_ids: vec![2],
            send_password_email: false,
        }
    }

    #[test]
    fn test_create_request_requires_roles() {
        let mut request = create_request();
        assert!(request.validate().is_ok());

        request.role_ids.clear();
        request.phone = Some("0".repeat(21));
        let err = request.validate().unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["phone", "roleIds"]);
    }

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let request = UpdateUserRequest {
            phone: MaybeUndefined::Null,
            first_name: MaybeUndefined::Value("Jane".to_string()),
            is_active: Some(false),
            ..Default::default()
        };

        let update = request.into_update();

        assert_eq!(
            update.fields,
            vec![
                UserField::FirstName(Some("Jane".to_string())),
                UserField::Phone(None),
                UserField::IsActive(false),
            ]
        );
        assert!(update.role_ids.is_none());
    }

    #[test]
    fn test_update_request_checks_lengths_of_present_values() {
        let request = UpdateUserRequest {
            first_name: MaybeUndefined::Value("J".repeat(51)),
            last_name: MaybeUndefined::Null,
            phone: MaybeUndefined::Value("0".repeat(21)),
            ..Default::default()
        };

        let err = request.validate().unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["firstName", "phone"]);

        let cleared = UpdateUserRequest {
            display_name: MaybeUndefined::Null,
            ..Default::default()
        };
        assert!(cleared.validate().is_ok());
    }

    #[test]
    fn test_user_dto_strips_hash_and_flattens_permissions() {
        let mut snapshot = fixtures::snapshot(
            4,
            vec![
                fixtures::grant(2, "admin", &["user.read", "tour.read"]),
                fixtures::grant(3, "user", &["tour.read"]),
            ],
        );
        snapshot.user.first_name = Some("John".to_string());
        snapshot.user.password_hash = "$argon2id$secret".to_string();

        let dto = UserDto::from(&snapshot);

        assert_eq!(dto.full_name, "John");
        assert_eq!(dto.permissions, vec!["tour.read", "user.read"]);
        assert_eq!(dto.roles.len(), 2);
        assert_eq!(dto.status, UserStatus::Active);
    }
}
