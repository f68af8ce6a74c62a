use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::sync::Arc;

use crate::config::{AppSettings, SecretManager};
use crate::errors::InternalError;
use crate::errors::internal::TokenError;
use crate::types::internal::auth::{Claims, TokenIdentity, TokenKind, TokenPair};

/// Signs and verifies HS256 bearer tokens
///
/// Tokens are stateless: there is no server-side revocation, expiry is the
/// only way a token stops being accepted.
pub struct TokenProvider {
    secret_manager: Arc<SecretManager>,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenProvider {
    /// Create a TokenProvider with issuer and lifetimes taken from `settings`
    pub fn new(secret_manager: Arc<SecretManager>, settings: &AppSettings) -> Self {
        Self::with_ttls(
            secret_manager,
            settings.token_issuer.clone(),
            settings.access_token_ttl(),
            settings.refresh_token_ttl(),
            settings.reset_token_ttl(),
        )
    }

    pub fn with_ttls(
        secret_manager: Arc<SecretManager>,
        issuer: String,
        access_ttl: Duration,
        refresh_ttl: Duration,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            secret_manager,
            issuer,
            access_ttl,
            refresh_ttl,
            reset_ttl,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::ResetPassword => self.reset_ttl,
        }
    }

    /// Seconds an access token stays valid
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Mint a token of `kind` for `identity`
    ///
    /// # Errors
    /// Returns `InternalError::Crypto` if signing fails
    pub fn issue(&self, identity: &TokenIdentity, kind: TokenKind) -> Result<String, InternalError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: identity.user_id.to_string(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            kind,
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.ttl(kind).num_seconds(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret_manager.jwt_secret().as_bytes()),
        )
        .map_err(|e| InternalError::crypto("jwt_generation", format!("Failed to sign {} token: {}", kind, e)))
    }

    pub fn issue_pair(&self, identity: &TokenIdentity) -> Result<TokenPair, InternalError> {
        Ok(TokenPair {
            access_token: self.issue(identity, TokenKind::Access)?,
            refresh_token: self.issue(identity, TokenKind::Refresh)?,
            expires_in: self.access_ttl_seconds(),
        })
    }

    pub fn issue_reset_token(&self, identity: &TokenIdentity) -> Result<String, InternalError> {
        self.issue(identity, TokenKind::ResetPassword)
    }

    /// Decode and check a token
    ///
    /// Expired, malformed (bad signature, structure or issuer) and wrong-purpose
    /// tokens fail with distinct `TokenError` variants. No clock leeway is applied.
    pub fn verify(&self, token: &str, expected: Option<TokenKind>) -> Result<Claims, InternalError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_manager.jwt_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => InternalError::from(TokenError::Expired),
            _ => InternalError::from(TokenError::Malformed),
        })?;

        if let Some(expected) = expected {
            if claims.kind != expected {
                return Err(TokenError::KindMismatch {
                    expected,
                    actual: claims.kind,
                }
                .into());
            }
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("secret_manager", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl_minutes", &self.access_ttl.num_minutes())
            .field("refresh_ttl_days", &self.refresh_ttl.num_days())
            .field("reset_ttl_minutes", &self.reset_ttl.num_minutes())
            .finish()
    }
}
