use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, IntoActiveModel, TransactionTrait};
use sea_orm::ActiveValue::Set;

use crate::app_data::AppData;
use crate::cache::CacheLayer;
use crate::coordinators::transaction::{self, DEFAULT_RETRY_ATTEMPTS};
use crate::errors::InternalError;
use crate::errors::internal::{AccessError, DatabaseError, RequestError, ResourceError};
use crate::providers::{
    CryptoProvider, IdentityProvider, InputValidatorProvider, PasswordValidatorProvider,
};
use crate::stores::{NewUser, RoleStore, UserStore};
use crate::types::db::user;
use crate::types::dto::user::CreateUserRequest;
use crate::types::internal::bulk::{BULK_CHUNK_SIZE, BulkOutcome, MAX_BULK_SIZE};
use crate::types::internal::context::RequestContext;
use crate::types::internal::query::{Page, UserQuery};
use crate::types::internal::rbac::SUPERADMIN_USERNAME;
use crate::types::internal::snapshot::UserSnapshot;
use crate::types::internal::user_update::UserUpdate;

const READ: &[&str] = &["user.read"];
const WRITE: &[&str] = &["user.write"];
const DELETE: &[&str] = &["user.delete"];

/// User administration coordinator
///
/// Every mutation runs in one transaction that re-reads the target row under
/// lock and re-checks the business rules there; cache entries are dropped
/// only after commit.
pub struct UserCoordinator {
    db: DatabaseConnection,
    user_store: Arc<UserStore>,
    role_store: Arc<RoleStore>,
    cache: Arc<CacheLayer>,
    crypto_provider: Arc<CryptoProvider>,
    identity_provider: Arc<IdentityProvider>,
    password_validator: Arc<PasswordValidatorProvider>,
    input_validator: Arc<InputValidatorProvider>,
}

impl UserCoordinator {
    /// Create UserCoordinator from AppData
    pub fn new(app_data: Arc<AppData>) -> Self {
        Self {
            db: app_data.db.clone(),
            user_store: app_data.user_store.clone(),
            role_store: app_data.role_store.clone(),
            cache: app_data.cache.clone(),
            crypto_provider: app_data.crypto_provider.clone(),
            identity_provider: app_data.identity_provider.clone(),
            password_validator: app_data.password_validator.clone(),
            input_validator: app_data.input_validator.clone(),
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        query: &UserQuery,
    ) -> Result<Page<UserSnapshot>, InternalError> {
        self.identity_provider.require_permission(ctx, READ).await?;
        self.user_store.list(&self.db, query).await
    }

    /// Single user, read through the cache
    pub async fn get(&self, ctx: &RequestContext, id: i32) -> Result<UserSnapshot, InternalError> {
        self.identity_provider.require_permission(ctx, READ).await?;
        self.identity_provider
            .snapshot(id)
            .await?
            .ok_or_else(|| ResourceError::user().into())
    }

    /// Orchestrate user creation
    ///
    /// Coordinates the sequence of operations:
    /// 1. Check the acting user's permission and the username/email shape
    /// 2. Generate a random password and hash it
    /// 3. In one transaction: check uniqueness, resolve roles, re-resolve the
    ///    creator, insert the user and its role links
    /// 4. After commit, clear the user cache and the entries of the
    ///    roles whose member count changed
    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateUserRequest,
    ) -> Result<UserSnapshot, InternalError> {
        let actor = self.identity_provider.require_permission(ctx, WRITE).await?;
        let (username, email) = self
            .input_validator
            .user_identity(&request.username, &request.email)?;
        if request.role_ids.is_empty() {
            return Err(RequestError::RoleRequired.into());
        }

        let password = self.crypto_provider.generate_password();
        let password_hash = self.crypto_provider.hash_password(&password)?;

        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        let display_name = request
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", first_name, last_name).trim().to_string());

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            if let Some(existing) = self.user_store.find_conflicting(&txn, &username, &email).await? {
                if existing.username == username {
                    return Err(RequestError::UsernameTaken.into());
                }
                return Err(RequestError::EmailTaken.into());
            }

            let roles = self.role_store.resolve(&txn, &request.role_ids).await?;
            let creator = self
                .user_store
                .find_by_id(&txn, actor.id())
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::actor("Creator")))?;

            let created = self
                .user_store
                .insert(
                    &txn,
                    NewUser {
                        username: username.clone(),
                        email: email.clone(),
                        password_hash,
                        first_name: Some(first_name),
                        last_name: Some(last_name),
                        display_name: Some(display_name),
                        phone: request.phone.as_deref().map(str::trim).map(str::to_string),
                        is_active: true,
                        is_verified: false,
                        created_by: Some(creator.id),
                    },
                )
                .await?;

            let role_ids: Vec<i32> = roles.iter().map(|role| role.id).collect();
            self.user_store.replace_roles(&txn, created.id, &role_ids).await?;
            self.user_store.load_snapshot(&txn, created).await
        }
        .await;
        let snapshot = transaction::complete(txn, "create user", result).await?;

        self.cache.clear_users();
        self.cache.invalidate_roles(&granted_role_ids(&snapshot));
        tracing::debug!("User cache cleared after creating user {}", snapshot.id());

        if request.send_password_email {
            tracing::warn!(
                request_id = %ctx.request_id,
                "Password delivery requested for {} but no delivery channel is configured",
                snapshot.user.username
            );
        }

        tracing::info!(
            request_id = %ctx.request_id,
            "User created by {}: {}",
            actor.user.username,
            snapshot.user.username
        );
        Ok(snapshot)
    }

    /// Orchestrate a partial user update
    ///
    /// Coordinates the sequence of operations:
    /// 1. Check the acting user's permission and any new email's shape
    /// 2. In one transaction (retried on transient store errors): lock the
    ///    target, apply the superadmin guard, re-resolve the updater, check
    ///    email uniqueness, replace roles if given, apply the present fields
    /// 3. After commit, drop that user's cache entry and the entries of every
    ///    role it gained or lost
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i32,
        update: UserUpdate,
    ) -> Result<UserSnapshot, InternalError> {
        let actor = self.identity_provider.require_permission(ctx, WRITE).await?;
        if let Some(email) = update.new_email() {
            self.input_validator.email(&email.trim().to_lowercase())?;
        }

        let actor = &actor;
        let update = &update;
        let (snapshot, affected_roles) =
            transaction::with_retry(DEFAULT_RETRY_ATTEMPTS, "update user", move || async move {
                let txn = transaction::begin(&self.db).await?;
                let result = self.apply_update(&txn, actor, id, update).await;
                transaction::complete(txn, "update user", result).await
            })
            .await?;

        self.cache.invalidate_user(id);
        self.cache.invalidate_roles(&affected_roles);
        tracing::debug!("User cache entry {} invalidated", id);
        tracing::info!(
            request_id = %ctx.request_id,
            "User updated by {}: {}",
            actor.user.username,
            snapshot.user.username
        );
        Ok(snapshot)
    }

    /// Shared body of single and bulk updates; runs inside `txn`
    ///
    /// Also returns the ids of the roles whose membership changed.
    async fn apply_update(
        &self,
        txn: &DatabaseTransaction,
        actor: &UserSnapshot,
        id: i32,
        update: &UserUpdate,
    ) -> Result<(UserSnapshot, Vec<i32>), InternalError> {
        let target = self.lock_target(txn, id).await?;
        self.guard_superadmin(actor, &target)?;
        let updater = self.resolve_actor_row(txn, actor, "Updater").await?;

        if let Some(email) = update.new_email() {
            let email = email.trim().to_lowercase();
            if self.user_store.email_taken_by_other(txn, &email, id).await? {
                return Err(RequestError::EmailTaken.into());
            }
        }

        let mut affected_roles = Vec::new();
        if let Some(role_ids) = &update.role_ids {
            if role_ids.is_empty() {
                return Err(RequestError::RoleRequired.into());
            }
            self.role_store.resolve(txn, role_ids).await?;
            affected_roles = self.user_store.role_ids_of(txn, id).await?;
            self.user_store.replace_roles(txn, id, role_ids).await?;
            affected_roles.extend_from_slice(role_ids);
            affected_roles.sort_unstable();
            affected_roles.dedup();
        }

        let mut model = target.into_active_model();
        update.apply_to(&mut model);
        model.updated_by = Set(Some(updater.id));
        let updated = self.user_store.update(txn, model).await?;
        let snapshot = self.user_store.load_snapshot(txn, updated).await?;
        Ok((snapshot, affected_roles))
    }

    /// Orchestrate user deletion
    ///
    /// The superadmin account and the acting user's own account are refused.
    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> Result<(), InternalError> {
        let actor = self.identity_provider.require_permission(ctx, DELETE).await?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let target = self.lock_target(&txn, id).await?;
            let deleter = self.resolve_actor_row(&txn, &actor, "Deleter").await?;

            if target.username == SUPERADMIN_USERNAME {
                tracing::warn!(request_id = %ctx.request_id, "Refused deletion of the superadmin account by {}", deleter.username);
                return Err(AccessError::SuperadminDeletion.into());
            }
            if target.id == deleter.id {
                tracing::warn!(request_id = %ctx.request_id, "Refused self-deletion by {}", deleter.username);
                return Err(AccessError::SelfDeletion.into());
            }

            let held_roles = self.user_store.role_ids_of(&txn, target.id).await?;
            self.user_store.delete(&txn, target.id).await?;
            Ok::<_, InternalError>((target, held_roles))
        }
        .await;
        let (deleted, held_roles) = transaction::complete(txn, "delete user", result).await?;

        self.cache.invalidate_user(id);
        self.cache.invalidate_roles(&held_roles);
        tracing::info!(
            request_id = %ctx.request_id,
            "User deleted by {}: {}",
            actor.user.username,
            deleted.username
        );
        Ok(())
    }

    /// Set a new password chosen by an administrator and clear any lockout
    pub async fn reset_password(
        &self,
        ctx: &RequestContext,
        id: i32,
        new_password: &str,
    ) -> Result<(), InternalError> {
        let actor = self.identity_provider.require_permission(ctx, WRITE).await?;
        self.password_validator
            .validate(new_password)
            .map_err(RequestError::from)?;
        let hash = self.crypto_provider.hash_password(new_password)?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let target = self.lock_target(&txn, id).await?;
            self.guard_superadmin(&actor, &target)?;
            let updater = self.resolve_actor_row(&txn, &actor, "Updater").await?;
            self.user_store
                .clear_lockout(&txn, target, Some(hash), updater.id)
                .await
        }
        .await;
        let user = transaction::complete(txn, "reset password", result).await?;

        self.cache.invalidate_user(id);
        tracing::info!(
            request_id = %ctx.request_id,
            "Password reset by {} for user: {}",
            actor.user.username,
            user.username
        );
        Ok(())
    }

    /// Clear the lock flag and the failed-login counter
    pub async fn unlock(&self, ctx: &RequestContext, id: i32) -> Result<(), InternalError> {
        let actor = self.identity_provider.require_permission(ctx, WRITE).await?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let target = self.lock_target(&txn, id).await?;
            let updater = self.resolve_actor_row(&txn, &actor, "Updater").await?;
            self.user_store.clear_lockout(&txn, target, None, updater.id).await
        }
        .await;
        let user = transaction::complete(txn, "unlock user", result).await?;

        self.cache.invalidate_user(id);
        tracing::info!(
            request_id = %ctx.request_id,
            "User unlocked by {}: {}",
            actor.user.username,
            user.username
        );
        Ok(())
    }

    /// Apply one update to many users
    ///
    /// Runs in a single outer transaction, in chunks of `BULK_CHUNK_SIZE`.
    /// Each item gets its own savepoint: a failing item is rolled back and
    /// recorded while the others still commit.
    pub async fn bulk_update(
        &self,
        ctx: &RequestContext,
        ids: &[i32],
        update: UserUpdate,
    ) -> Result<BulkOutcome, InternalError> {
        let actor = self.identity_provider.require_permission(ctx, WRITE).await?;
        if ids.is_empty() {
            return Err(RequestError::EmptyBatch.into());
        }
        if ids.len() > MAX_BULK_SIZE {
            return Err(RequestError::BatchTooLarge { max: MAX_BULK_SIZE }.into());
        }
        if let Some(email) = update.new_email() {
            self.input_validator.email(&email.trim().to_lowercase())?;
        }

        let txn = transaction::begin(&self.db).await?;
        let mut outcome = BulkOutcome::default();
        let mut touched = Vec::new();
        let mut affected_roles = Vec::new();
        let result = async {
            for chunk in ids.chunks(BULK_CHUNK_SIZE) {
                for &id in chunk {
                    let savepoint = txn
                        .begin()
                        .await
                        .map_err(|e| InternalError::from(DatabaseError::TransactionBegin { source: e }))?;
                    match self.apply_update(&savepoint, &actor, id, &update).await {
                        Ok((_, roles)) => {
                            savepoint
                                .commit()
                                .await
                                .map_err(|e| InternalError::from(DatabaseError::TransactionCommit { source: e }))?;
                            outcome.record_success();
                            touched.push(id);
                            affected_roles.extend(roles);
                        }
                        Err(err) => {
                            savepoint
                                .rollback()
                                .await
                                .map_err(|e| InternalError::from(DatabaseError::TransactionRollback { source: e }))?;
                            let err = transaction::surface("update user", err);
                            tracing::debug!("Bulk update of user {} failed: {}", id, err);
                            outcome.record_failure(id, err);
                        }
                    }
                }
            }
            Ok::<(), InternalError>(())
        }
        .await;
        transaction::complete(txn, "bulk update users", result).await?;

        self.cache.invalidate_users(&touched);
        affected_roles.sort_unstable();
        affected_roles.dedup();
        self.cache.invalidate_roles(&affected_roles);
        tracing::info!(
            request_id = %ctx.request_id,
            "Bulk update by {}: {} succeeded, {} failed",
            actor.user.username,
            outcome.success,
            outcome.failed
        );
        Ok(outcome)
    }

    async fn lock_target(&self, txn: &DatabaseTransaction, id: i32) -> Result<user::Model, InternalError> {
        self.user_store
            .find_by_id_for_update(txn, id)
            .await?
            .ok_or_else(|| ResourceError::user().into())
    }

    /// The acting user must still exist when the write happens
    async fn resolve_actor_row(
        &self,
        txn: &DatabaseTransaction,
        actor: &UserSnapshot,
        role_in_operation: &str,
    ) -> Result<user::Model, InternalError> {
        self.user_store
            .find_by_id(txn, actor.id())
            .await?
            .ok_or_else(|| ResourceError::actor(role_in_operation).into())
    }

    fn guard_superadmin(&self, actor: &UserSnapshot, target: &user::Model) -> Result<(), InternalError> {
        if target.username == SUPERADMIN_USERNAME && !actor.is_superadmin() {
            tracing::warn!("Refused modification of the superadmin account by {}", actor.user.username);
            return Err(AccessError::SuperadminModification.into());
        }
        Ok(())
    }
}

fn granted_role_ids(snapshot: &UserSnapshot) -> Vec<i32> {
    snapshot.roles.iter().map(|grant| grant.role.id).collect()
}
