use std::collections::BTreeSet;

use poem_openapi::Enum;

use crate::types::db::{permission, role, user};
use crate::types::internal::rbac::SUPERADMIN_ROLE;

/// A role as attached to a user, with its permissions
#[derive(Debug, Clone, PartialEq)]
pub struct RoleGrant {
    pub role: role::Model,
    pub permissions: Vec<permission::Model>,
}

/// User row together with its roles and their permissions
///
/// This is what the user cache holds and what the authorization evaluator
/// inspects. `created_by` / `updated_by` stay plain ids.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSnapshot {
    pub user: user::Model,
    pub roles: Vec<RoleGrant>,
}

/// Derived account state; a locked account reports `Locked` even when inactive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[oai(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Locked,
}

impl UserSnapshot {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|grant| grant.role.name.clone()).collect()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|grant| grant.role.name == name)
    }

    pub fn is_superadmin(&self) -> bool {
        self.has_role(SUPERADMIN_ROLE)
    }

    /// Union by name of every permission across all roles
    pub fn effective_permissions(&self) -> BTreeSet<String> {
        self.roles
            .iter()
            .flat_map(|grant| grant.permissions.iter().map(|p| p.name.clone()))
            .collect()
    }

    pub fn status(&self) -> UserStatus {
        status_of(&self.user)
    }
}

pub fn status_of(user: &user::Model) -> UserStatus {
    if user.is_locked {
        UserStatus::Locked
    } else if user.is_active {
        UserStatus::Active
    } else {
        UserStatus::Inactive
    }
}

/// Role row with its permissions and the number of users holding it
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSnapshot {
    pub role: role::Model,
    pub permissions: Vec<permission::Model>,
    pub user_count: u64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user(id: i32, username: &str) -> user::Model {
        user::Model {
            id,
            username: username.to_string(),
            password_hash: String::new(),
            email: format!("{}@example.org", username),
            first_name: None,
            last_name: None,
            display_name: None,
            phone: None,
            avatar_url: None,
            is_verified: true,
            is_active: true,
            is_locked: false,
            login_attempts: 0,
            last_login_at: None,
            created_by: None,
            updated_by: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn grant(role_id: i32, name: &str, permissions: &[&str]) -> RoleGrant {
        RoleGrant {
            role: role::Model {
                id: role_id,
                name: name.to_string(),
                description: None,
                is_system: name == SUPERADMIN_ROLE,
                created_at: 0,
                updated_at: 0,
            },
            permissions: permissions
                .iter()
                .enumerate()
                .map(|(index, perm)| permission::Model {
                    id: role_id * 100 + index as i32,
                    name: perm.to_string(),
                    module: "USER".to_string(),
                    action: "READ".to_string(),
                    description: None,
                    created_at: 0,
                    updated_at: 0,
                })
                .collect(),
        }
    }

    pub fn snapshot(id: i32, grants: Vec<RoleGrant>) -> UserSnapshot {
        UserSnapshot {
            user: user(id, &format!("user{}", id)),
            roles: grants,
        }
    }
}
