use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::errors::InternalError;
use crate::stores::RoleStore;
use crate::types::db::{user, user_role};
use crate::types::internal::query::{Page, SortOrder, UserQuery, UserSortField};
use crate::types::internal::snapshot::UserSnapshot;

/// Fields of a user row written at creation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_by: Option<i32>,
}

/// User rows, their role links and lockout counters
#[derive(Debug, Default)]
pub struct UserStore {
    roles: RoleStore,
}

impl UserStore {
    pub fn new() -> Self {
        Self { roles: RoleStore::new() }
    }

    pub async fn find_by_id(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_user_by_id", e))
    }

    /// Read the row for mutation, holding a write lock where the backend supports it
    pub async fn find_by_id_for_update(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| InternalError::database("lock_user", e))
    }

    /// Usernames are stored lower-cased and trimmed
    pub async fn find_by_username_for_update(
        &self,
        conn: &impl ConnectionTrait,
        username: &str,
    ) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username.trim().to_lowercase()))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| InternalError::database("lock_user_by_username", e))
    }

    /// First row sharing either the username or the email
    pub async fn find_conflicting(
        &self,
        conn: &impl ConnectionTrait,
        username: &str,
        email: &str,
    ) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Email.eq(email)),
            )
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_conflicting_user", e))
    }

    pub async fn email_taken_by_other(
        &self,
        conn: &impl ConnectionTrait,
        email: &str,
        user_id: i32,
    ) -> Result<bool, InternalError> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::Id.ne(user_id))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("check_email", e))?;
        Ok(count > 0)
    }

    pub async fn insert(
        &self,
        conn: &impl ConnectionTrait,
        new_user: NewUser,
    ) -> Result<user::Model, InternalError> {
        let now = Utc::now().timestamp();
        let model = user::ActiveModel {
            username: Set(new_user.username),
            password_hash: Set(new_user.password_hash),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            display_name: Set(new_user.display_name),
            phone: Set(new_user.phone),
            avatar_url: Set(None),
            is_verified: Set(new_user.is_verified),
            is_active: Set(new_user.is_active),
            is_locked: Set(false),
            login_attempts: Set(0),
            last_login_at: Set(None),
            created_by: Set(new_user.created_by),
            updated_by: Set(new_user.created_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model
            .insert(conn)
            .await
            .map_err(|e| InternalError::database("insert_user", e))
    }

    /// Persist the changed columns and stamp `updated_at`
    pub async fn update(
        &self,
        conn: &impl ConnectionTrait,
        mut model: user::ActiveModel,
    ) -> Result<user::Model, InternalError> {
        model.updated_at = Set(Utc::now().timestamp());
        model
            .update(conn)
            .await
            .map_err(|e| InternalError::database("update_user", e))
    }

    pub async fn delete(&self, conn: &impl ConnectionTrait, id: i32) -> Result<(), InternalError> {
        user::Entity::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("delete_user", e))?;
        Ok(())
    }

    /// Bump the failure counter; lock once it reaches `max_attempts`
    pub async fn record_failed_login(
        &self,
        conn: &impl ConnectionTrait,
        user: user::Model,
        max_attempts: i32,
    ) -> Result<user::Model, InternalError> {
        let attempts = user.login_attempts.saturating_add(1);
        let mut model = user.into_active_model();
        model.login_attempts = Set(attempts);
        if attempts >= max_attempts {
            model.is_locked = Set(true);
        }
        self.update(conn, model).await
    }

    pub async fn record_successful_login(
        &self,
        conn: &impl ConnectionTrait,
        user: user::Model,
    ) -> Result<user::Model, InternalError> {
        let mut model = user.into_active_model();
        model.login_attempts = Set(0);
        model.last_login_at = Set(Some(Utc::now().timestamp()));
        self.update(conn, model).await
    }

    /// Zero the counter and clear the lock, optionally replacing the password hash
    pub async fn clear_lockout(
        &self,
        conn: &impl ConnectionTrait,
        user: user::Model,
        password_hash: Option<String>,
        updated_by: i32,
    ) -> Result<user::Model, InternalError> {
        let mut model = user.into_active_model();
        model.login_attempts = Set(0);
        model.is_locked = Set(false);
        model.updated_by = Set(Some(updated_by));
        if let Some(hash) = password_hash {
            model.password_hash = Set(hash);
        }
        self.update(conn, model).await
    }

    pub async fn set_password_hash(
        &self,
        conn: &impl ConnectionTrait,
        user: user::Model,
        password_hash: String,
        updated_by: i32,
    ) -> Result<user::Model, InternalError> {
        let mut model = user.into_active_model();
        model.password_hash = Set(password_hash);
        model.updated_by = Set(Some(updated_by));
        self.update(conn, model).await
    }

    /// Replace the user's full role set
    pub async fn replace_roles(
        &self,
        conn: &impl ConnectionTrait,
        user_id: i32,
        role_ids: &[i32],
    ) -> Result<(), InternalError> {
        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("clear_user_roles", e))?;

        let mut unique = role_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        if unique.is_empty() {
            return Ok(());
        }

        let links = unique.into_iter().map(|role_id| user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_id),
        });
        user_role::Entity::insert_many(links)
            .exec_without_returning(conn)
            .await
            .map_err(|e| InternalError::database("assign_user_roles", e))?;
        Ok(())
    }

    /// Ids of the roles currently linked to the user, ascending
    pub async fn role_ids_of(
        &self,
        conn: &impl ConnectionTrait,
        user_id: i32,
    ) -> Result<Vec<i32>, InternalError> {
        user_role::Entity::find()
            .select_only()
            .column(user_role::Column::RoleId)
            .filter(user_role::Column::UserId.eq(user_id))
            .order_by_asc(user_role::Column::RoleId)
            .into_tuple::<i32>()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("find_user_roles", e))
    }

    pub async fn ids_with_role(
        &self,
        conn: &impl ConnectionTrait,
        role_id: i32,
    ) -> Result<Vec<i32>, InternalError> {
        user_role::Entity::find()
            .select_only()
            .column(user_role::Column::UserId)
            .filter(user_role::Column::RoleId.eq(role_id))
            .into_tuple::<i32>()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("find_role_members", e))
    }

    pub async fn find_with_role(
        &self,
        conn: &impl ConnectionTrait,
        role_id: i32,
    ) -> Result<Vec<user::Model>, InternalError> {
        user::Entity::find()
            .filter(user::Column::Id.in_subquery(role_members(role_id)))
            .order_by_asc(user::Column::Id)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("find_role_members", e))
    }

    pub async fn find_snapshot(
        &self,
        conn: &impl ConnectionTrait,
        id: i32,
    ) -> Result<Option<UserSnapshot>, InternalError> {
        match self.find_by_id(conn, id).await? {
            Some(user) => Ok(Some(self.load_snapshot(conn, user).await?)),
            None => Ok(None),
        }
    }

    pub async fn load_snapshot(
        &self,
        conn: &impl ConnectionTrait,
        user: user::Model,
    ) -> Result<UserSnapshot, InternalError> {
        let mut snapshots = self.load_snapshots(conn, vec![user]).await?;
        snapshots
            .pop()
            .ok_or_else(|| InternalError::parse("user_snapshot", "snapshot assembly returned no row"))
    }

    /// Attach roles and permissions to a batch of users in three queries
    pub async fn load_snapshots(
        &self,
        conn: &impl ConnectionTrait,
        users: Vec<user::Model>,
    ) -> Result<Vec<UserSnapshot>, InternalError> {
        if users.is_empty() {
            return Ok(Vec::new());
        }
        let user_ids: Vec<i32> = users.iter().map(|u| u.id).collect();
        let links = user_role::Entity::find()
            .filter(user_role::Column::UserId.is_in(user_ids))
            .order_by_asc(user_role::Column::RoleId)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("load_user_roles", e))?;

        let role_ids: Vec<i32> = links.iter().map(|link| link.role_id).collect();
        let grants: HashMap<i32, _> = self
            .roles
            .load_grants(conn, &role_ids)
            .await?
            .into_iter()
            .map(|grant| (grant.role.id, grant))
            .collect();

        let mut by_user: HashMap<i32, Vec<_>> = HashMap::new();
        for link in links {
            if let Some(grant) = grants.get(&link.role_id) {
                by_user.entry(link.user_id).or_default().push(grant.clone());
            }
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let roles = by_user.remove(&user.id).unwrap_or_default();
                UserSnapshot { user, roles }
            })
            .collect())
    }

    pub async fn list(
        &self,
        conn: &impl ConnectionTrait,
        query: &UserQuery,
    ) -> Result<Page<UserSnapshot>, InternalError> {
        let mut condition = Condition::all();
        if let Some(active) = query.is_active {
            condition = condition.add(user::Column::IsActive.eq(active));
        }
        if let Some(verified) = query.is_verified {
            condition = condition.add(user::Column::IsVerified.eq(verified));
        }
        if let Some(locked) = query.is_locked {
            condition = condition.add(user::Column::IsLocked.eq(locked));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(user::Column::Username.contains(search))
                    .add(user::Column::Email.contains(search))
                    .add(user::Column::DisplayName.contains(search))
                    .add(user::Column::FirstName.contains(search))
                    .add(user::Column::LastName.contains(search)),
            );
        }
        if let Some(role_id) = query.role_id {
            condition = condition.add(user::Column::Id.in_subquery(role_members(role_id)));
        }
        if let Some(after) = query.created_after {
            condition = condition.add(user::Column::CreatedAt.gte(after));
        }
        if let Some(before) = query.created_before {
            condition = condition.add(user::Column::CreatedAt.lte(before));
        }

        let column = match query.sort_by {
            UserSortField::Id => user::Column::Id,
            UserSortField::Username => user::Column::Username,
            UserSortField::Email => user::Column::Email,
            UserSortField::FirstName => user::Column::FirstName,
            UserSortField::LastName => user::Column::LastName,
            UserSortField::CreatedAt => user::Column::CreatedAt,
            UserSortField::UpdatedAt => user::Column::UpdatedAt,
            UserSortField::LastLoginAt => user::Column::LastLoginAt,
        };
        let select = user::Entity::find().filter(condition);
        let select = match query.order {
            SortOrder::Asc => select.order_by_asc(column).order_by_asc(user::Column::Id),
            SortOrder::Desc => select.order_by_desc(column).order_by_desc(user::Column::Id),
        };

        let paginator = select.paginate(conn, query.page.limit);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| InternalError::database("count_users", e))?;
        let users = paginator
            .fetch_page(query.page.index())
            .await
            .map_err(|e| InternalError::database("list_users", e))?;

        let snapshots = self.load_snapshots(conn, users).await?;
        Ok(Page::new(snapshots, total, query.page))
    }
}

fn role_members(role_id: i32) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(user_role::Column::UserId)
        .from(user_role::Entity)
        .and_where(Expr::col(user_role::Column::RoleId).eq(role_id))
        .to_owned()
}
