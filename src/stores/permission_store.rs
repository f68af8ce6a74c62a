use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::errors::InternalError;
use crate::errors::internal::RequestError;
use crate::types::db::{permission, role_permission};
use crate::types::internal::query::{Page, PermissionQuery};
use crate::types::internal::rbac::{PermissionAction, PermissionModule};

#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionStore;

impl PermissionStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<permission::Model>, InternalError> {
        permission::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_permission_by_id", e))
    }

    pub async fn find_by_id_for_update(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<permission::Model>, InternalError> {
        permission::Entity::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| InternalError::database("lock_permission", e))
    }

    pub async fn find_by_name(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
    ) -> Result<Option<permission::Model>, InternalError> {
        permission::Entity::find()
            .filter(permission::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_permission_by_name", e))
    }

    pub async fn all(&self, conn: &impl ConnectionTrait) -> Result<Vec<permission::Model>, InternalError> {
        permission::Entity::find()
            .order_by_asc(permission::Column::Id)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("list_all_permissions", e))
    }

    /// Resolve every id or fail naming the ones that do not exist
    pub async fn resolve(
        &self,
        conn: &impl ConnectionTrait,
        ids: &[i32],
    ) -> Result<Vec<permission::Model>, InternalError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = permission::Entity::find()
            .filter(permission::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(permission::Column::Id)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("resolve_permissions", e))?;

        let missing: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| !found.iter().any(|p| p.id == *id))
            .collect();
        if !missing.is_empty() {
            return Err(RequestError::missing_references("Permissions", missing).into());
        }
        Ok(found)
    }

    pub async fn insert(
        &self,
        conn: &impl ConnectionTrait,
        name: String,
        module: PermissionModule,
        action: PermissionAction,
        description: Option<String>,
    ) -> Result<permission::Model, InternalError> {
        let now = Utc::now().timestamp();
        permission::ActiveModel {
            name: Set(name),
            module: Set(module.as_str().to_string()),
            action: Set(action.as_str().to_string()),
            description: Set(description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| InternalError::database("insert_permission", e))
    }

    pub async fn update(
        &self,
        conn: &impl ConnectionTrait,
        mut model: permission::ActiveModel,
    ) -> Result<permission::Model, InternalError> {
        model.updated_at = Set(Utc::now().timestamp());
        model
            .update(conn)
            .await
            .map_err(|e| InternalError::database("update_permission", e))
    }

    pub async fn delete(&self, conn: &impl ConnectionTrait, id: i32) -> Result<(), InternalError> {
        permission::Entity::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("delete_permission", e))?;
        Ok(())
    }

    /// Number of roles granting the permission
    pub async fn role_count(&self, conn: &impl ConnectionTrait, id: i32) -> Result<u64, InternalError> {
        role_permission::Entity::find()
            .filter(role_permission::Column::PermissionId.eq(id))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("count_permission_roles", e))
    }

    pub async fn list(
        &self,
        conn: &impl ConnectionTrait,
        query: &PermissionQuery,
    ) -> Result<Page<permission::Model>, InternalError> {
        let mut condition = Condition::all();
        if let Some(module) = query.module {
            condition = condition.add(permission::Column::Module.eq(module.as_str()));
        }
        if let Some(action) = query.action {
            condition = condition.add(permission::Column::Action.eq(action.as_str()));
        }

        let paginator = permission::Entity::find()
            .filter(condition)
            .order_by_asc(permission::Column::Module)
            .order_by_asc(permission::Column::Name)
            .paginate(conn, query.page.limit);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| InternalError::database("count_permissions", e))?;
        let items = paginator
            .fetch_page(query.page.index())
            .await
            .map_err(|e| InternalError::database("list_permissions", e))?;
        Ok(Page::new(items, total, query.page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::{seed_catalogue, setup_test_db};
    use crate::types::internal::query::PageRequest;

    #[tokio::test]
    async fn test_list_filters_by_module_and_action() {
        let db = setup_test_db().await;
        seed_catalogue(&db).await;

        let query = PermissionQuery {
            module: Some(PermissionModule::User),
            action: None,
            page: PageRequest::default(),
        };
        let page = PermissionStore::new().list(&db, &query).await.unwrap();
        assert_eq!(page.total, 3);

        let query = PermissionQuery {
            module: Some(PermissionModule::Tour),
            action: Some(PermissionAction::Delete),
            page: PageRequest::default(),
        };
        let page = PermissionStore::new().list(&db, &query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "tour.delete");
    }

    #[tokio::test]
    async fn test_role_count_tracks_grants() {
        let db = setup_test_db().await;
        seed_catalogue(&db).await;
        let store = PermissionStore::new();

        let user_read = store.find_by_name(&db, "user.read").await.unwrap().unwrap();
        let user_delete = store.find_by_name(&db, "user.delete").await.unwrap().unwrap();

        // superadmin + admin grant user.read, only superadmin grants user.delete
        assert_eq!(store.role_count(&db, user_read.id).await.unwrap(), 2);
        assert_eq!(store.role_count(&db, user_delete.id).await.unwrap(), 1);
    }
}
