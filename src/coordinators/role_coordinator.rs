use std::sync::Arc;

use sea_orm::ActiveValue::Set;
use sea_orm::{DatabaseConnection, IntoActiveModel};

use crate::app_data::AppData;
use crate::cache::CacheLayer;
use crate::coordinators::transaction;
use crate::errors::InternalError;
use crate::errors::internal::{AccessError, RequestError, ResourceError};
use crate::providers::{IdentityProvider, InputValidatorProvider};
use crate::stores::{PermissionStore, RoleStore, UserStore};
use crate::types::db::user;
use crate::types::dto::role::{CreateRoleRequest, UpdateRoleRequest};
use crate::types::internal::context::RequestContext;
use crate::types::internal::query::{Page, RoleQuery};
use crate::types::internal::snapshot::RoleSnapshot;

const READ: &[&str] = &["role.read"];
const WRITE: &[&str] = &["role.write"];
const DELETE: &[&str] = &["role.delete"];

/// Role administration coordinator
///
/// System roles can only be created, changed or deleted by a superadmin, and
/// a role still held by any user cannot be deleted.
pub struct RoleCoordinator {
    db: DatabaseConnection,
    role_store: Arc<RoleStore>,
    permission_store: Arc<PermissionStore>,
    user_store: Arc<UserStore>,
    cache: Arc<CacheLayer>,
    identity_provider: Arc<IdentityProvider>,
    input_validator: Arc<InputValidatorProvider>,
}

impl RoleCoordinator {
    /// Create RoleCoordinator from AppData
    pub fn new(app_data: Arc<AppData>) -> Self {
        Self {
            db: app_data.db.clone(),
            role_store: app_data.role_store.clone(),
            permission_store: app_data.permission_store.clone(),
            user_store: app_data.user_store.clone(),
            cache: app_data.cache.clone(),
            identity_provider: app_data.identity_provider.clone(),
            input_validator: app_data.input_validator.clone(),
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        query: &RoleQuery,
    ) -> Result<Page<RoleSnapshot>, InternalError> {
        self.identity_provider.require_permission(ctx, READ).await?;
        self.role_store.list(&self.db, query).await
    }

    /// Single role, read through the cache
    pub async fn get(&self, ctx: &RequestContext, id: i32) -> Result<RoleSnapshot, InternalError> {
        self.identity_provider.require_permission(ctx, READ).await?;

        if let Some(snapshot) = self.cache.get_role(id) {
            return Ok(snapshot);
        }
        let generation = self.cache.role_generation();
        let snapshot = self
            .role_store
            .find_snapshot(&self.db, id)
            .await?
            .ok_or_else(|| InternalError::from(ResourceError::role()))?;
        self.cache.fill_role(snapshot.clone(), generation);
        Ok(snapshot)
    }

    /// Users currently holding the role
    pub async fn users(&self, ctx: &RequestContext, id: i32) -> Result<Vec<user::Model>, InternalError> {
        self.identity_provider.require_permission(ctx, READ).await?;
        if self.role_store.find_by_id(&self.db, id).await?.is_none() {
            return Err(ResourceError::role().into());
        }
        self.user_store.find_with_role(&self.db, id).await
    }

    /// Orchestrate role creation
    ///
    /// Coordinates the sequence of operations:
    /// 1. Check the acting user's permission and the role name
    /// 2. Refuse system roles unless the actor is a superadmin
    /// 3. In one transaction: check the name is free, resolve every
    ///    permission id, insert the role and its permission links
    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateRoleRequest,
    ) -> Result<RoleSnapshot, InternalError> {
        let actor = self.identity_provider.require_permission(ctx, WRITE).await?;
        let name = self.input_validator.role_name(&request.name)?;
        if request.is_system && !actor.is_superadmin() {
            tracing::warn!(request_id = %ctx.request_id, "Refused system role creation by {}", actor.user.username);
            return Err(AccessError::SystemRoleCreation.into());
        }

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            if self.role_store.find_by_name(&txn, &name).await?.is_some() {
                return Err(RequestError::RoleNameTaken.into());
            }
            let permissions = self
                .permission_store
                .resolve(&txn, &request.permission_ids)
                .await?;

            let role = self
                .role_store
                .insert(&txn, name.clone(), trimmed(request.description.clone()), request.is_system)
                .await?;
            let permission_ids: Vec<i32> = permissions.iter().map(|p| p.id).collect();
            self.role_store
                .replace_permissions(&txn, role.id, &permission_ids)
                .await?;

            self.role_store
                .find_snapshot(&txn, role.id)
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::role()))
        }
        .await;
        let snapshot = transaction::complete(txn, "create role", result).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            "Role created: {} (ID: {}) by {}",
            snapshot.role.name,
            snapshot.role.id,
            actor.user.username
        );
        Ok(snapshot)
    }

    /// Orchestrate a partial role update
    ///
    /// A new permission list replaces the old one; every holder of the role
    /// loses its cached snapshot after commit.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i32,
        request: UpdateRoleRequest,
    ) -> Result<RoleSnapshot, InternalError> {
        let actor = self.identity_provider.require_permission(ctx, WRITE).await?;
        let name = match request.name.as_deref() {
            Some(name) => Some(self.input_validator.role_name(name)?),
            None => None,
        };
        if matches!(&request.permission_ids, Some(ids) if ids.is_empty()) {
            return Err(RequestError::invalid("Permission IDs cannot be empty").into());
        }

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let role = self
                .role_store
                .find_by_id_for_update(&txn, id)
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::role()))?;
            if role.is_system && !actor.is_superadmin() {
                tracing::warn!(request_id = %ctx.request_id, "Refused change of system role {} by {}", role.name, actor.user.username);
                return Err(AccessError::SystemRoleModification.into());
            }

            if let Some(name) = &name {
                if let Some(existing) = self.role_store.find_by_name(&txn, name).await? {
                    if existing.id != id {
                        return Err(RequestError::RoleNameTaken.into());
                    }
                }
            }

            if let Some(permission_ids) = &request.permission_ids {
                self.permission_store.resolve(&txn, permission_ids).await?;
                self.role_store
                    .replace_permissions(&txn, id, permission_ids)
                    .await?;
            }

            let mut model = role.into_active_model();
            if let Some(name) = name.clone() {
                model.name = Set(name);
            }
            if let Some(description) = request.description.clone() {
                model.description = Set(trimmed(Some(description)));
            }
            self.role_store.update(&txn, model).await?;

            let members = self.user_store.ids_with_role(&txn, id).await?;
            let snapshot = self
                .role_store
                .find_snapshot(&txn, id)
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::role()))?;
            Ok::<_, InternalError>((snapshot, members))
        }
        .await;
        let (snapshot, members) = transaction::complete(txn, "update role", result).await?;

        self.cache.invalidate_role(id);
        self.cache.invalidate_users(&members);
        tracing::debug!("Role {} and {} member snapshots invalidated", id, members.len());
        tracing::info!(
            request_id = %ctx.request_id,
            "Role updated: {} (ID: {}) by {}",
            snapshot.role.name,
            id,
            actor.user.username
        );
        Ok(snapshot)
    }

    /// Delete a role no user holds
    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> Result<(), InternalError> {
        let actor = self.identity_provider.require_permission(ctx, DELETE).await?;

        let txn = transaction::begin(&self.db).await?;
        let result = async {
            let role = self
                .role_store
                .find_by_id_for_update(&txn, id)
                .await?
                .ok_or_else(|| InternalError::from(ResourceError::role()))?;
            if role.is_system && !actor.is_superadmin() {
                tracing::warn!(request_id = %ctx.request_id, "Refused deletion of system role {} by {}", role.name, actor.user.username);
                return Err(AccessError::SystemRoleDeletion.into());
            }
            if self.role_store.user_count(&txn, id).await? > 0 {
                return Err(RequestError::RoleInUse.into());
            }
            self.role_store.delete(&txn, id).await?;
            Ok::<_, InternalError>(role)
        }
        .await;
        let role = transaction::complete(txn, "delete role", result).await?;

        self.cache.invalidate_role(id);
        tracing::info!(
            request_id = %ctx.request_id,
            "Role deleted: {} (ID: {}) by {}",
            role.name,
            id,
            actor.user.username
        );
        Ok(())
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinators::UserCoordinator;
    use crate::test::utils::{create_test_user, seed_superadmin, setup_test_app};
    use crate::types::internal::context::RequestSource;
    use crate::types::internal::user_update::UserUpdate;

    fn as_user(id: i32) -> RequestContext {
        RequestContext::for_actor(id, RequestSource::API)
    }

    fn create_request(name: &str, is_system: bool, permission_ids: Vec<i32>) -> CreateRoleRequest {
        CreateRoleRequest {
            name: name.to_string(),
            description: Some(" Tour desk ".to_string()),
            is_system,
            permission_ids,
        }
    }

    #[tokio::test]
    async fn test_create_role_with_permissions() {
        let app = setup_test_app().await;
        let root = seed_superadmin(&app, "Admin123!").await;
        let coordinator = RoleCoordinator::new(app);

        let snapshot = coordinator
            .create(&as_user(root.id), create_request("tour_desk", false, vec![10, 11]))
            .await
            .unwrap();

        assert_eq!(snapshot.role.name, "tour_desk");
        assert_eq!(snapshot.role.description.as_deref(), Some("Tour desk"));
        assert_eq!(snapshot.permissions.len(), 2);
        assert_eq!(snapshot.user_count, 0);
    }

    #[tokio::test]
    async fn test_create_role_rejects_bad_input() {
        let app = setup_test_app().await;
        let root = seed_superadmin(&app, "Admin123!").await;
        let coordinator = RoleCoordinator::new(app);
        let ctx = as_user(root.id);

        let err = coordinator
            .create(&ctx, create_request("admin", false, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, InternalError::Request(RequestError::RoleNameTaken)));

        let err = coordinator
            .create(&ctx, create_request("desk-1", false, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Name can only contain letters, numbers, spaces and underscores");

        let err = coordinator
            .create(&ctx, create_request("desk", false, vec![1, 500]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Permissions not found: 500");
    }

    #[tokio::test]
    async fn test_system_roles_need_superadmin() {
        let app = setup_test_app().await;
        let role_admin = create_test_user(&app, "roleadmin", "Secret123!", &[2]).await;
        app.role_store.replace_permissions(&app.db, 2, &[1, 2, 3, 4, 5, 6]).await.unwrap();
        let coordinator = RoleCoordinator::new(app);
        let ctx = as_user(role_admin.id);

        let err = coordinator
            .create(&ctx, create_request("ops", true, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, InternalError::Access(AccessError::SystemRoleCreation)));

        let err = coordinator
            .update(&ctx, 1, UpdateRoleRequest { description: Some("x".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, InternalError::Access(AccessError::SystemRoleModification)));

        let err = coordinator.delete(&ctx, 1).await.unwrap_err();
        assert!(matches!(err, InternalError::Access(AccessError::SystemRoleDeletion)));
    }

    #[tokio::test]
    async fn test_update_role_invalidates_member_snapshots() {
        let app = setup_test_app().await;
        let root = seed_superadmin(&app, "Admin123!").await;
        let member = create_test_user(&app, "member", "Secret123!", &[3]).await;
        let coordinator = RoleCoordinator::new(app.clone());

        let before = app.identity_provider.snapshot(member.id).await.unwrap().unwrap();
        assert!(!before.effective_permissions().contains("tour.write"));

        let tour_write = app
            .permission_store
            .find_by_name(&app.db, "tour.write")
            .await
            .unwrap()
            .unwrap();
        let tour_read = app
            .permission_store
            .find_by_name(&app.db, "tour.read")
            .await
            .unwrap()
            .unwrap();
        coordinator
            .update(
                &as_user(root.id),
                3,
                UpdateRoleRequest {
                    permission_ids: Some(vec![tour_read.id, tour_write.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(app.cache.get_user(member.id).is_none());
        let after = app.identity_provider.snapshot(member.id).await.unwrap().unwrap();
        assert!(after.effective_permissions().contains("tour.write"));
    }

    #[tokio::test]
    async fn test_role_in_use_cannot_be_deleted_until_released() {
        let app = setup_test_app().await;
        let root = seed_superadmin(&app, "Admin123!").await;
        let ctx = as_user(root.id);
        let roles = RoleCoordinator::new(app.clone());
        let users = UserCoordinator::new(app.clone());

        let role = roles.create(&ctx, create_request("guides", false, vec![])).await.unwrap();
        let member = create_test_user(&app, "guide", "Secret123!", &[role.role.id]).await;

        let err = roles.delete(&ctx, role.role.id).await.unwrap_err();
        assert!(matches!(err, InternalError::Request(RequestError::RoleInUse)));

        users
            .update(&ctx, member.id, UserUpdate::new().with_roles(vec![3]))
            .await
            .unwrap();
        roles.delete(&ctx, role.role.id).await.unwrap();

        let err = roles.get(&ctx, role.role.id).await.unwrap_err();
        assert!(matches!(err, InternalError::Resource(_)));
    }

    #[tokio::test]
    async fn test_role_users_lists_holders() {
        let app = setup_test_app().await;
        let root = seed_superadmin(&app, "Admin123!").await;
        create_test_user(&app, "u1", "Secret123!", &[3]).await;
        create_test_user(&app, "u2", "Secret123!", &[2, 3]).await;
        let coordinator = RoleCoordinator::new(app);

        let holders = coordinator.users(&as_user(root.id), 3).await.unwrap();
        let names: Vec<_> = holders.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["u1", "u2"]);

        assert!(coordinator.users(&as_user(root.id), 77).await.is_err());
    }
}
