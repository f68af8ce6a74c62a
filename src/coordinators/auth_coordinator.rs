use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction};

use crate::app_data::AppData;
use crate::cache::CacheLayer;
use crate::config::AppSettings;
use crate::coordinators::transaction;
use crate::errors::InternalError;
use crate::errors::internal::{AccessError, CredentialError, RequestError, ResourceError};
use crate::providers::{
    CryptoProvider, IdentityProvider, PasswordValidatorProvider, TokenProvider,
};
use crate::stores::UserStore;
use crate::types::db::user;
use crate::types::internal::auth::{AuthSession, TokenIdentity, TokenKind, TokenPair};
use crate::types::internal::context::RequestContext;
use crate::types::internal::snapshot::UserSnapshot;

/// Outcome of the credential check, decided inside the login transaction
///
/// A wrong password is not an `Err` at that point: the counter change must
/// commit before the caller sees the rejection.
enum LoginVerdict {
    Accepted(UserSnapshot),
    Rejected { user_id: i32, attempts: i32, locked: bool },
}

/// Authentication coordinator that orchestrates login, token refresh and
/// password change workflows
pub struct AuthCoordinator {
    db: DatabaseConnection,
    settings: Arc<AppSettings>,
    user_store: Arc<UserStore>,
    cache: Arc<CacheLayer>,
    token_provider: Arc<TokenProvider>,
    crypto_provider: Arc<CryptoProvider>,
    identity_provider: Arc<IdentityProvider>,
    password_validator: Arc<PasswordValidatorProvider>,
}

impl AuthCoordinator {
    /// Create AuthCoordinator from AppData
    ///
    /// Follows the AppData pattern: takes Arc<AppData> as single parameter
    /// and extracts the shared stores and providers.
    pub fn new(app_data: Arc<AppData>) -> Self {
        Self {
            db: app_data.db.clone(),
            settings: app_data.settings.clone(),
            user_store: app_data.user_store.clone(),
            cache: app_data.cache.clone(),
            token_provider: app_data.token_provider.clone(),
            crypto_provider: app_data.crypto_provider.clone(),
            identity_provider: app_data.identity_provider.clone(),
            password_validator: app_data.password_validator.clone(),
        }
    }

    /// Get a reference to the internal TokenProvider
    ///
    /// The API layer uses it to verify bearer tokens.
    pub fn token_provider(&self) -> Arc<TokenProvider> {
        self.token_provider.clone()
    }

    /// Orchestrate a complete login workflow
    ///
    /// Coordinates the sequence of operations:
    /// 1. Lock the user row by username
    /// 2. Reject inactive or locked accounts before looking at the password
    /// 3. Verify the password; on mismatch bump the counter (locking at the
    ///    threshold) and commit that change
    /// 4. On match reset the counter and stamp `last_login_at`
    /// 5. Mint an access and a refresh token
    ///
    /// An unknown username and a wrong password fail identically.
    pub async fn login(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<AuthSession, InternalError> {
        tracing::info!(request_id = %ctx.request_id, "Login attempt for user: {}", username);

        let txn = transaction::begin(&self.db).await?;
        let result = self.check_credentials(&txn, username, password).await;
        let verdict = transaction::complete(txn, "log in", result).await?;

        match verdict {
            LoginVerdict::Rejected { user_id, attempts, locked } => {
                self.cache.invalidate_user(user_id);
                if locked {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        "Account locked due to too many failed attempts: user {}",
                        user_id
                    );
                } else {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        "Login failed: wrong password for user {} (attempt {})",
                        user_id,
                        attempts
                    );
                }
                Err(CredentialError::InvalidCredentials.into())
            }
            LoginVerdict::Accepted(snapshot) => {
                self.cache.invalidate_user(snapshot.id());
                let tokens = self
                    .token_provider
                    .issue_pair(&TokenIdentity::from(&snapshot.user))?;
                self.cache.set_user(snapshot.clone());

                tracing::info!(request_id = %ctx.request_id, "Login successful for user: {}", snapshot.user.username);
                Ok(AuthSession { tokens, user: snapshot })
            }
        }
    }

    async fn check_credentials(
        &self,
        txn: &DatabaseTransaction,
        username: &str,
        password: &str,
    ) -> Result<LoginVerdict, InternalError> {
        let Some(user) = self.user_store.find_by_username_for_update(txn, username).await? else {
            tracing::warn!("Login failed: user {} not found", username);
            return Err(CredentialError::InvalidCredentials.into());
        };

        ensure_may_sign_in(&user)?;

        if !self.crypto_provider.verify_password(password, &user.password_hash)? {
            let updated = self
                .user_store
                .record_failed_login(txn, user, self.settings.max_login_attempts)
                .await?;
            return Ok(LoginVerdict::Rejected {
                user_id: updated.id,
                attempts: updated.login_attempts,
                locked: updated.is_locked,
            });
        }

        let updated = self.user_store.record_successful_login(txn, user).await?;
        let snapshot = self.user_store.load_snapshot(txn, updated).await?;
        Ok(LoginVerdict::Accepted(snapshot))
    }

    /// Orchestrate refresh token workflow
    ///
    /// Coordinates the sequence of operations:
    /// 1. Verify the token is an unexpired REFRESH token
    /// 2. Re-read the user and re-check active/locked state
    /// 3. Mint a fresh token pair (login counters untouched)
    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<TokenPair, InternalError> {
        let claims = self
            .token_provider
            .verify(refresh_token, Some(TokenKind::Refresh))?;
        let user_id = claims.user_id()?;

        let user = self
            .user_store
            .find_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| InternalError::from(AccessError::Unauthenticated))?;
        ensure_may_sign_in(&user)?;

        let tokens = self.token_provider.issue_pair(&TokenIdentity::from(&user))?;
        tracing::info!(request_id = %ctx.request_id, "Token refreshed for user: {}", user.username);
        Ok(tokens)
    }

    /// Current user with roles and effective permissions
    pub async fn profile(&self, ctx: &RequestContext) -> Result<UserSnapshot, InternalError> {
        let actor_id = ctx.actor_id()?;
        self.identity_provider
            .snapshot(actor_id)
            .await?
            .ok_or_else(|| ResourceError::user().into())
    }

    /// Orchestrate a self-service password change
    ///
    /// Coordinates the sequence of operations:
    /// 1. Check the new password against the policy
    /// 2. Lock the acting user's row and re-verify the current password
    /// 3. Store the new hash; lock state and counters are left alone
    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), InternalError> {
        let actor_id = ctx.actor_id()?;
        self.password_validator
            .validate(new_password)
            .map_err(RequestError::from)?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let user = self
                .user_store
                .find_by_id_for_update(&txn, actor_id)
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::user()))?;

            if !self.crypto_provider.verify_password(current_password, &user.password_hash)? {
                return Err(CredentialError::IncorrectPassword.into());
            }

            let hash = self.crypto_provider.hash_password(new_password)?;
            self.user_store
                .set_password_hash(&txn, user, hash, actor_id)
                .await
        }
        .await;
        let user = transaction::complete(txn, "change password", result).await?;

        self.cache.invalidate_user(actor_id);
        tracing::info!(request_id = %ctx.request_id, "Password changed for user: {}", user.username);
        Ok(())
    }

    /// Tokens are stateless; logging out only records the event
    pub async fn logout(&self, ctx: &RequestContext) -> Result<(), InternalError> {
        let actor_id = ctx.actor_id()?;
        tracing::info!(request_id = %ctx.request_id, "User {} logged out", actor_id);
        Ok(())
    }

    /// Mint a RESET_PASSWORD token for `user_id`
    ///
    /// Requires `user.write`; delivering the token is left to the caller.
    pub async fn issue_reset_token(
        &self,
        ctx: &RequestContext,
        user_id: i32,
    ) -> Result<String, InternalError> {
        let actor = self
            .identity_provider
            .require_permission(ctx, &["user.write"])
            .await?;
        let user = self
            .user_store
            .find_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| InternalError::from(ResourceError::user()))?;

        let token = self
            .token_provider
            .issue_reset_token(&TokenIdentity::from(&user))?;
        tracing::info!(
            request_id = %ctx.request_id,
            "Reset token issued by {} for user: {}",
            actor.user.username,
            user.username
        );
        Ok(token)
    }

    /// Id of the user a RESET_PASSWORD token was issued for, if it still exists
    pub async fn verify_reset_token(&self, token: &str) -> Result<i32, InternalError> {
        let claims = self
            .token_provider
            .verify(token, Some(TokenKind::ResetPassword))?;
        let user_id = claims.user_id()?;

        self.user_store
            .find_by_id(&self.db, user_id)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| ResourceError::user().into())
    }
}

/// Gate applied before any credential check and again on refresh
fn ensure_may_sign_in(user: &user::Model) -> Result<(), InternalError> {
    if !user.is_active {
        tracing::warn!("Sign-in refused: account {} is deactivated", user.username);
        return Err(CredentialError::AccountDeactivated.into());
    }
    if user.is_locked {
        tracing::warn!("Sign-in refused: account {} is locked", user.username);
        return Err(CredentialError::AccountLocked.into());
    }
    Ok(())
}
