use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::cache::CacheLayer;
use crate::errors::InternalError;
use crate::errors::internal::AccessError;
use crate::providers::authorization_provider::{AuthorizationEvaluator, MatchMode};
use crate::stores::UserStore;
use crate::types::internal::context::RequestContext;
use crate::types::internal::snapshot::UserSnapshot;

/// Read-through access to user snapshots and the acting user's gates
pub struct IdentityProvider {
    db: DatabaseConnection,
    user_store: Arc<UserStore>,
    cache: Arc<CacheLayer>,
    evaluator: AuthorizationEvaluator,
}

impl IdentityProvider {
    pub fn new(db: DatabaseConnection, user_store: Arc<UserStore>, cache: Arc<CacheLayer>) -> Self {
        Self {
            db,
            user_store,
            cache,
            evaluator: AuthorizationEvaluator::new(),
        }
    }

    /// Cache first, then the store; a store hit populates the cache unless
    /// the entry was invalidated while the store read was in flight
    ///
    /// Must not be called while a transaction holds the connection.
    pub async fn snapshot(&self, user_id: i32) -> Result<Option<UserSnapshot>, InternalError> {
        if let Some(snapshot) = self.cache.get_user(user_id) {
            return Ok(Some(snapshot));
        }

        let generation = self.cache.user_generation();
        let snapshot = self.user_store.find_snapshot(&self.db, user_id).await?;
        if let Some(snapshot) = &snapshot {
            self.cache.fill_user(snapshot.clone(), generation);
        }
        Ok(snapshot)
    }

    /// The authenticated user behind `ctx`; a vanished account is unauthenticated
    pub async fn resolve_actor(&self, ctx: &RequestContext) -> Result<UserSnapshot, InternalError> {
        let actor_id = ctx.actor_id()?;
        self.snapshot(actor_id)
            .await?
            .ok_or_else(|| AccessError::Unauthenticated.into())
    }

    /// Resolve the actor and require any of `permissions`
    pub async fn require_permission(
        &self,
        ctx: &RequestContext,
        permissions: &[&str],
    ) -> Result<UserSnapshot, InternalError> {
        let actor = self.resolve_actor(ctx).await?;
        self.evaluator
            .assert_permission(Some(&actor), permissions, MatchMode::Any)?;
        Ok(actor)
    }

    /// Resolve the actor and require any of `roles`
    pub async fn require_role(
        &self,
        ctx: &RequestContext,
        roles: &[&str],
    ) -> Result<UserSnapshot, InternalError> {
        let actor = self.resolve_actor(ctx).await?;
        self.evaluator.assert_role(Some(&actor), roles)?;
        Ok(actor)
    }

    pub fn evaluator(&self) -> &AuthorizationEvaluator {
        &self.evaluator
    }
}
