use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

pub mod access;
pub mod credential;
pub mod database;
pub mod password;
pub mod request;
pub mod resource;
pub mod token;
pub mod validation;

pub use access::AccessError;
pub use credential::CredentialError;
pub use database::DatabaseError;
pub use password::PasswordValidationError;
pub use request::RequestError;
pub use resource::ResourceError;
pub use token::TokenError;
pub use validation::{FieldViolation, ValidationError};

/// Message fragments that mark a store failure as transient.
const RETRYABLE_MARKERS: [&str; 6] = [
    "deadlock",
    "timeout",
    "connection",
    "try again",
    "serialization",
    "database is locked",
];

/// Internal error type for store, provider and coordinator operations
///
/// Infrastructure errors (database, parse, crypto) are shared; domain errors are
/// grouped per concern and pass unchanged through every layer up to the API
/// boundary, where `ApiError::from_internal_error` maps them to a status code.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Parse error: failed to parse {value_type}: {message}")]
    Parse { value_type: String, message: String },

    #[error("Crypto error: {operation} failed: {message}")]
    Crypto { operation: String, message: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Non-domain failure caught at a transaction boundary
    #[error("Failed to {operation}")]
    OperationFailed {
        operation: String,
        #[source]
        source: Box<InternalError>,
    },
}

impl InternalError {
    /// Wrap a sea-orm error raised by `operation`
    ///
    /// Unique-constraint violations are promoted to `RequestError::Conflict`:
    /// they only surface here when a concurrent writer won the race past the
    /// in-transaction uniqueness check.
    pub fn database(operation: &str, source: DbErr) -> InternalError {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = source.sql_err() {
            tracing::warn!("Unique constraint violated during {}: {}", operation, detail);
            return InternalError::Request(RequestError::Conflict);
        }
        InternalError::Database(DatabaseError::Operation {
            operation: operation.to_string(),
            source,
        })
    }

    pub fn parse(value_type: &str, message: impl Into<String>) -> InternalError {
        InternalError::Parse {
            value_type: value_type.to_string(),
            message: message.into(),
        }
    }

    pub fn crypto(operation: &str, message: impl Into<String>) -> InternalError {
        InternalError::Crypto {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn operation_failed(operation: &str, source: InternalError) -> InternalError {
        InternalError::OperationFailed {
            operation: operation.to_string(),
            source: Box::new(source),
        }
    }

    /// Domain errors carry a caller-facing message and must never be wrapped.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            InternalError::Credential(_)
                | InternalError::Token(_)
                | InternalError::Access(_)
                | InternalError::Resource(_)
                | InternalError::Request(_)
                | InternalError::Validation(_)
        )
    }

    /// Whether repeating the failed unit of work may succeed
    ///
    /// Classification is by message inspection of the underlying store error.
    pub fn is_retryable(&self) -> bool {
        match self {
            InternalError::Database(err) => {
                let message = err.to_string().to_lowercase();
                RETRYABLE_MARKERS.iter().any(|marker| message.contains(marker))
            }
            InternalError::OperationFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_not_wrapped() {
        assert!(InternalError::from(CredentialError::InvalidCredentials).is_domain());
        assert!(InternalError::from(AccessError::SelfDeletion).is_domain());
        assert!(InternalError::from(ResourceError::user()).is_domain());
        assert!(InternalError::from(RequestError::RoleRequired).is_domain());
        assert!(!InternalError::parse("timestamp", "out of range").is_domain());
        assert!(!InternalError::crypto("hash_password", "bad params").is_domain());
    }

    #[test]
    fn test_retryable_classification_by_message() {
        let locked = InternalError::database(
            "update_user",
            DbErr::Custom("database is locked".to_string()),
        );
        assert!(locked.is_retryable());

        let deadlock = InternalError::database(
            "update_user",
            DbErr::Custom("Deadlock found when trying to get lock".to_string()),
        );
        assert!(deadlock.is_retryable());

        let wrapped = InternalError::operation_failed("update user", deadlock);
        assert!(wrapped.is_retryable());

        let syntax = InternalError::database("update_user", DbErr::Custom("syntax error".to_string()));
        assert!(!syntax.is_retryable());

        assert!(!InternalError::from(AccessError::InsufficientRole).is_retryable());
    }

    #[test]
    fn test_operation_failed_message_is_generic() {
        let err = InternalError::operation_failed(
            "create role",
            InternalError::crypto("hash_password", "params rejected"),
        );
        assert_eq!(err.to_string(), "Failed to create role");
    }
}
