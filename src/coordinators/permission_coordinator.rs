use std::sync::Arc;

use sea_orm::ActiveValue::Set;
use sea_orm::{DatabaseConnection, IntoActiveModel};

use crate::app_data::AppData;
use crate::cache::CacheLayer;
use crate::coordinators::transaction;
use crate::errors::InternalError;
use crate::errors::internal::{RequestError, ResourceError};
use crate::providers::IdentityProvider;
use crate::stores::PermissionStore;
use crate::types::db::permission;
use crate::types::dto::permission::PermissionRequest;
use crate::types::internal::context::RequestContext;
use crate::types::internal::query::{Page, PermissionQuery};
use crate::types::internal::rbac::SUPERADMIN_ROLE;

/// Permission catalogue maintenance; every operation is superadmin-only
pub struct PermissionCoordinator {
    db: DatabaseConnection,
    permission_store: Arc<PermissionStore>,
    cache: Arc<CacheLayer>,
    identity_provider: Arc<IdentityProvider>,
}

impl PermissionCoordinator {
    pub fn new(app_data: Arc<AppData>) -> Self {
        Self {
            db: app_data.db.clone(),
            permission_store: app_data.permission_store.clone(),
            cache: app_data.cache.clone(),
            identity_provider: app_data.identity_provider.clone(),
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        query: &PermissionQuery,
    ) -> Result<Page<permission::Model>, InternalError> {
        self.identity_provider.require_role(ctx, &[SUPERADMIN_ROLE]).await?;
        self.permission_store.list(&self.db, query).await
    }

    pub async fn get(&self, ctx: &RequestContext, id: i32) -> Result<permission::Model, InternalError> {
        self.identity_provider.require_role(ctx, &[SUPERADMIN_ROLE]).await?;
        self.permission_store
            .find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ResourceError::permission().into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: PermissionRequest,
    ) -> Result<permission::Model, InternalError> {
        self.identity_provider.require_role(ctx, &[SUPERADMIN_ROLE]).await?;
        let name = required_name(&request.name)?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            if self.permission_store.find_by_name(&txn, &name).await?.is_some() {
                return Err(RequestError::PermissionNameTaken.into());
            }
            self.permission_store
                .insert(
                    &txn,
                    name.clone(),
                    request.module,
                    request.action,
                    description(request.description.clone()),
                )
                .await
        }
        .await;
        let created = transaction::complete(txn, "create permission", result).await?;

        tracing::info!(request_id = %ctx.request_id, "Permission created: {} (ID: {})", created.name, created.id);
        Ok(created)
    }

    /// Replace name, module, action and description
    ///
    /// Role and user snapshots embed permission names, so every cache entry
    /// is dropped after commit.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i32,
        request: PermissionRequest,
    ) -> Result<permission::Model, InternalError> {
        self.identity_provider.require_role(ctx, &[SUPERADMIN_ROLE]).await?;
        let name = required_name(&request.name)?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let existing = self
                .permission_store
                .find_by_id_for_update(&txn, id)
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::permission()))?;
            if let Some(other) = self.permission_store.find_by_name(&txn, &name).await? {
                if other.id != id {
                    return Err(RequestError::PermissionNameTaken.into());
                }
            }

            let mut model = existing.into_active_model();
            model.name = Set(name.clone());
            model.module = Set(request.module.as_str().to_string());
            model.action = Set(request.action.as_str().to_string());
            model.description = Set(description(request.description.clone()));
            self.permission_store.update(&txn, model).await
        }
        .await;
        let updated = transaction::complete(txn, "update permission", result).await?;

        self.cache.invalidate_all();
        tracing::debug!("All cache entries invalidated after permission {} changed", id);
        tracing::info!(request_id = %ctx.request_id, "Permission updated: {} (ID: {})", updated.name, id);
        Ok(updated)
    }

    /// Delete a permission no role grants
    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> Result<(), InternalError> {
        self.identity_provider.require_role(ctx, &[SUPERADMIN_ROLE]).await?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let existing = self
                .permission_store
                .find_by_id_for_update(&txn, id)
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::permission()))?;
            if self.permission_store.role_count(&txn, id).await? > 0 {
                return Err(RequestError::PermissionInUse.into());
            }
            self.permission_store.delete(&txn, id).await?;
            Ok::<_, InternalError>(existing)
        }
        .await;
        let deleted = transaction::complete(txn, "delete permission", result).await?;

        self.cache.invalidate_all();
        tracing::info!(request_id = %ctx.request_id, "Permission deleted: {} (ID: {})", deleted.name, id);
        Ok(())
    }
}

fn required_name(name: &str) -> Result<String, InternalError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RequestError::invalid("Name is required").into());
    }
    Ok(name.to_string())
}

fn description(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
