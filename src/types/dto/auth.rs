use poem_openapi::Object;

use crate::errors::internal::{FieldViolation, ValidationError};
use crate::types::dto::user::UserDto;

/// Request model for user login
#[derive(Object, Debug, Clone)]
#[oai(deny_unknown_fields)]
pub struct LoginRequest {
    /// Username for authentication
    pub username: String,

    /// Password for authentication
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        if self.username.trim().is_empty() {
            violations.push(FieldViolation::new("username", "Username is required"));
        }
        if self.password.is_empty() {
            violations.push(FieldViolation::new("password", "Password is required"));
        }
        ValidationError::check(violations)
    }
}

/// Tokens plus the sanitized user, its role names and effective permissions
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct LoginResponse {
    /// JWT access token for API authentication
    pub access_token: String,

    /// JWT refresh token for obtaining new access tokens
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Number of seconds until the access token expires
    pub expires_in: i64,

    pub user: UserDto,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// Request model for token refresh
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshRequest {
    /// Refresh token to exchange for a new token pair
    pub refresh_token: String,
}

/// Response model for token refresh
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Number of seconds until the access token expires
    pub expires_in: i64,
}

#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        if self.current_password.is_empty() {
            violations.push(FieldViolation::new("currentPassword", "Current password is required"));
        }
        if self.new_password.is_empty() {
            violations.push(FieldViolation::new("newPassword", "New password is required"));
        }
        ValidationError::check(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_requires_both_fields() {
        let request = LoginRequest {
            username: "  ".to_string(),
            password: String::new(),
        };

        let err = request.validate().unwrap_err();

        assert_eq!(err.violations.len(), 2);
        assert_eq!(err.violations[0].message, "Username is required");
    }
}
