use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::errors::InternalError;
use crate::errors::internal::RequestError;
use crate::types::db::{permission, role, role_permission, user_role};
use crate::types::internal::query::{Page, RoleQuery};
use crate::types::internal::snapshot::{RoleGrant, RoleSnapshot};

/// Role rows, their permission links and membership counts
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleStore;

impl RoleStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<role::Model>, InternalError> {
        role::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_role_by_id", e))
    }

    pub async fn find_by_id_for_update(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<role::Model>, InternalError> {
        role::Entity::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| InternalError::database("lock_role", e))
    }

    pub async fn find_by_name(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
    ) -> Result<Option<role::Model>, InternalError> {
        role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_role_by_name", e))
    }

    /// Resolve every id or fail naming the ones that do not exist
    pub async fn resolve(
        &self,
        conn: &impl ConnectionTrait,
        ids: &[i32],
    ) -> Result<Vec<role::Model>, InternalError> {
        let roles = role::Entity::find()
            .filter(role::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(role::Column::Id)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("resolve_roles", e))?;

        let missing: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| !roles.iter().any(|r| r.id == *id))
            .collect();
        if !missing.is_empty() {
            return Err(RequestError::missing_references("Roles", missing).into());
        }
        Ok(roles)
    }

    pub async fn insert(
        &self,
        conn: &impl ConnectionTrait,
        name: String,
        description: Option<String>,
        is_system: bool,
    ) -> Result<role::Model, InternalError> {
        let now = Utc::now().timestamp();
        role::ActiveModel {
            name: Set(name),
            description: Set(description),
            is_system: Set(is_system),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| InternalError::database("insert_role", e))
    }

    pub async fn update(
        &self,
        conn: &impl ConnectionTrait,
        mut model: role::ActiveModel,
    ) -> Result<role::Model, InternalError> {
        model.updated_at = Set(Utc::now().timestamp());
        model
            .update(conn)
            .await
            .map_err(|e| InternalError::database("update_role", e))
    }

    pub async fn delete(&self, conn: &impl ConnectionTrait, id: i32) -> Result<(), InternalError> {
        role::Entity::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("delete_role", e))?;
        Ok(())
    }

    pub async fn replace_permissions(
        &self,
        conn: &impl ConnectionTrait,
        role_id: i32,
        permission_ids: &[i32],
    ) -> Result<(), InternalError> {
        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("clear_role_permissions", e))?;

        let mut unique = permission_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        if unique.is_empty() {
            return Ok(());
        }

        let links = unique.into_iter().map(|permission_id| role_permission::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
        });
        role_permission::Entity::insert_many(links)
            .exec_without_returning(conn)
            .await
            .map_err(|e| InternalError::database("assign_role_permissions", e))?;
        Ok(())
    }

    pub async fn user_count(&self, conn: &impl ConnectionTrait, role_id: i32) -> Result<u64, InternalError> {
        user_role::Entity::find()
            .filter(user_role::Column::RoleId.eq(role_id))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("count_role_users", e))
    }

    async fn user_counts(
        &self,
        conn: &impl ConnectionTrait,
        role_ids: Vec<i32>,
    ) -> Result<HashMap<i32, u64>, InternalError> {
        let rows: Vec<(i32, i64)> = user_role::Entity::find()
            .select_only()
            .column(user_role::Column::RoleId)
            .column_as(user_role::Column::UserId.count(), "user_count")
            .filter(user_role::Column::RoleId.is_in(role_ids))
            .group_by(user_role::Column::RoleId)
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("count_role_users", e))?;

        Ok(rows
            .into_iter()
            .map(|(role_id, count)| (role_id, count.max(0) as u64))
            .collect())
    }

    /// Roles with their permissions, ordered by role id
    pub async fn load_grants(
        &self,
        conn: &impl ConnectionTrait,
        role_ids: &[i32],
    ) -> Result<Vec<RoleGrant>, InternalError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = role::Entity::find()
            .filter(role::Column::Id.is_in(role_ids.to_vec()))
            .order_by_asc(role::Column::Id)
            .find_with_related(permission::Entity)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("load_role_permissions", e))?;

        Ok(rows
            .into_iter()
            .map(|(role, mut permissions)| {
                permissions.sort_by_key(|p| p.id);
                RoleGrant { role, permissions }
            })
            .collect())
    }

    async fn snapshots(
        &self,
        conn: &impl ConnectionTrait,
        roles: Vec<role::Model>,
    ) -> Result<Vec<RoleSnapshot>, InternalError> {
        let ids: Vec<i32> = roles.iter().map(|r| r.id).collect();
        let mut grants: HashMap<i32, RoleGrant> = self
            .load_grants(conn, &ids)
            .await?
            .into_iter()
            .map(|grant| (grant.role.id, grant))
            .collect();
        let counts = self.user_counts(conn, ids).await?;

        Ok(roles
            .into_iter()
            .map(|role| RoleSnapshot {
                permissions: grants.remove(&role.id).map(|g| g.permissions).unwrap_or_default(),
                user_count: counts.get(&role.id).copied().unwrap_or(0),
                role,
            })
            .collect())
    }

    pub async fn find_snapshot(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<RoleSnapshot>, InternalError> {
        let Some(role) = self.find_by_id(conn, id).await? else {
            return Ok(None);
        };
        Ok(self.snapshots(conn, vec![role]).await?.pop())
    }

    pub async fn list(
        &self,
        conn: &impl ConnectionTrait,
        query: &RoleQuery,
    ) -> Result<Page<RoleSnapshot>, InternalError> {
        let mut condition = Condition::all();
        if let Some(name) = query.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(role::Column::Name.contains(name));
        }
        if let Some(is_system) = query.is_system {
            condition = condition.add(role::Column::IsSystem.eq(is_system));
        }
        if let Some(permission_name) = query.permission.as_deref() {
            let granting = Query::select()
                .column((role_permission::Entity, role_permission::Column::RoleId))
                .from(role_permission::Entity)
                .inner_join(
                    permission::Entity,
                    Expr::col((permission::Entity, permission::Column::Id))
                        .equals((role_permission::Entity, role_permission::Column::PermissionId)),
                )
                .and_where(Expr::col((permission::Entity, permission::Column::Name)).eq(permission_name))
                .to_owned();
            condition = condition.add(role::Column::Id.in_subquery(granting));
        }

        let paginator = role::Entity::find()
            .filter(condition)
            .order_by_desc(role::Column::CreatedAt)
            .order_by_desc(role::Column::Id)
            .paginate(conn, query.page.limit);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| InternalError::database("count_roles", e))?;
        let roles = paginator
            .fetch_page(query.page.index())
            .await
            .map_err(|e| InternalError::database("list_roles", e))?;

        let snapshots = self.snapshots(conn, roles).await?;
        Ok(Page::new(snapshots, total, query.page))
    }
}
