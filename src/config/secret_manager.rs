use std::fmt;

use crate::config::{EnvironmentProvider, SystemEnvironment};

const JWT_SECRET_VAR: &str = "JWT_SECRET";
const PEPPER_VAR: &str = "PASSWORD_PEPPER";
const JWT_SECRET_MIN_LENGTH: usize = 32;
const PEPPER_MIN_LENGTH: usize = 16;

/// Custom error type for secret-related failures
///
/// Any of these aborts startup: token signing cannot proceed without a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    Missing { secret_name: String },
    InvalidLength { secret_name: String, expected: usize, actual: usize },
}

impl SecretError {
    pub fn missing(secret_name: &str) -> Self {
        Self::Missing {
            secret_name: secret_name.to_string(),
        }
    }

    pub fn invalid_length(secret_name: &str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            secret_name: secret_name.to_string(),
            expected,
            actual,
        }
    }
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { secret_name } => {
                write!(f, "Required secret '{}' is missing", secret_name)
            }
            Self::InvalidLength { secret_name, expected, actual } => {
                write!(
                    f,
                    "Secret '{}' must be at least {} characters, got {}",
                    secret_name, expected, actual
                )
            }
        }
    }
}

impl std::error::Error for SecretError {}

/// Holds the token signing secret and the password pepper
pub struct SecretManager {
    jwt_secret: String,
    password_pepper: String,
}

impl SecretManager {
    /// Load secrets from the process environment
    ///
    /// # Errors
    /// Returns `SecretError` if a secret is missing or shorter than its minimum
    pub fn init() -> Result<Self, SecretError> {
        Self::from_env_provider(&SystemEnvironment)
    }

    pub fn from_env_provider(env: &dyn EnvironmentProvider) -> Result<Self, SecretError> {
        let jwt_secret = env
            .get_var(JWT_SECRET_VAR)
            .ok_or_else(|| SecretError::missing(JWT_SECRET_VAR))?;
        let password_pepper = env
            .get_var(PEPPER_VAR)
            .ok_or_else(|| SecretError::missing(PEPPER_VAR))?;

        Self::new(jwt_secret, password_pepper)
    }

    /// Build from explicit values, applying the same length rules as `init`
    pub fn new(jwt_secret: String, password_pepper: String) -> Result<Self, SecretError> {
        check_length(JWT_SECRET_VAR, &jwt_secret, JWT_SECRET_MIN_LENGTH)?;
        check_length(PEPPER_VAR, &password_pepper, PEPPER_MIN_LENGTH)?;

        Ok(Self {
            jwt_secret,
            password_pepper,
        })
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn password_pepper(&self) -> &str {
        &self.password_pepper
    }
}

fn check_length(secret_name: &str, value: &str, min_length: usize) -> Result<(), SecretError> {
    if value.is_empty() {
        return Err(SecretError::missing(secret_name));
    }
    if value.len() < min_length {
        return Err(SecretError::invalid_length(secret_name, min_length, value.len()));
    }
    Ok(())
}

impl fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManager")
            .field("jwt_secret", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretManager {{ secrets_loaded: 2 }}")
    }
}
