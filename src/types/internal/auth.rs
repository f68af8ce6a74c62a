use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::internal::TokenError;
use crate::errors::InternalError;
use crate::types::db::user;
use crate::types::internal::snapshot::UserSnapshot;

/// Purpose a token was minted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Access,
    Refresh,
    ResetPassword,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "ACCESS",
            TokenKind::Refresh => "REFRESH",
            TokenKind::ResetPassword => "RESET_PASSWORD",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub username: String,

    pub email: String,

    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, InternalError> {
        self.sub
            .parse::<i32>()
            .map_err(|_| InternalError::from(TokenError::Malformed))
    }
}

/// Identity embedded in every token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: i32,
    pub username: String,
    pub email: String,
}

impl From<&user::Model> for TokenIdentity {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Access + refresh tokens handed out at login and refresh
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[access_token]")
            .field("refresh_token", &"[refresh_token]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Result of a successful login: fresh tokens and the user they were minted for
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub tokens: TokenPair,
    pub user: UserSnapshot,
}
