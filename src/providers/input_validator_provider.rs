use regex::Regex;
use std::sync::LazyLock;

use crate::errors::InternalError;
use crate::errors::internal::RequestError;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static ROLE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_ ]+$").expect("valid role name pattern"));

/// Business-level checks on identifiers, run before any transaction opens
///
/// Failures are `RequestError::InvalidInput` (HTTP 400).
#[derive(Debug, Default, Clone, Copy)]
pub struct InputValidatorProvider;

impl InputValidatorProvider {
    pub fn new() -> Self {
        Self
    }

    /// Returns the normalized (trimmed, lower-cased) username and email
    pub fn user_identity(&self, username: &str, email: &str) -> Result<(String, String), InternalError> {
        let username = username.trim().to_lowercase();
        let email = email.trim().to_lowercase();

        if username.is_empty() || email.is_empty() {
            return Err(RequestError::invalid("Username and email are required").into());
        }
        self.email(&email)?;
        let length = username.chars().count();
        if !(3..=50).contains(&length) {
            return Err(RequestError::invalid("Username must be between 3 and 50 characters").into());
        }
        Ok((username, email))
    }

    pub fn email(&self, email: &str) -> Result<(), InternalError> {
        if !EMAIL_PATTERN.is_match(email) {
            return Err(RequestError::invalid("Invalid email format").into());
        }
        Ok(())
    }

    /// Returns the trimmed role name
    pub fn role_name(&self, name: &str) -> Result<String, InternalError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RequestError::invalid("Name cannot be blank").into());
        }
        let length = name.chars().count();
        if length < 2 {
            return Err(RequestError::invalid("Name must be at least 2 characters").into());
        }
        if length > 50 {
            return Err(RequestError::invalid("Name must not exceed 50 characters").into());
        }
        if !ROLE_NAME_PATTERN.is_match(name) {
            return Err(RequestError::invalid(
                "Name can only contain letters, numbers, spaces and underscores",
            )
            .into());
        }
        Ok(name.to_string())
    }
}
