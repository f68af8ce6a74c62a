use thiserror::Error;

use crate::types::internal::auth::TokenKind;

/// Bearer token verification failures (HTTP 401)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Access token is required")]
    Missing,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Malformed,

    #[error("Invalid token type: expected {expected}, got {actual}")]
    KindMismatch { expected: TokenKind, actual: TokenKind },
}
