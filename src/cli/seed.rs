// Seed command implementation
// Creates the permission catalogue, the built-in roles and the superadmin account

use sea_orm::ConnectionTrait;

use crate::app_data::AppData;
use crate::config::EnvironmentProvider;
use crate::coordinators::transaction;
use crate::errors::InternalError;
use crate::errors::internal::RequestError;
use crate::stores::{NewUser, PermissionStore, RoleStore};
use crate::types::db::user;
use crate::types::internal::rbac::{PermissionAction, PermissionModule, SUPERADMIN_ROLE, SUPERADMIN_USERNAME};

const MODULES: [PermissionModule; 4] = [
    PermissionModule::User,
    PermissionModule::Role,
    PermissionModule::Permission,
    PermissionModule::Tour,
];

/// Verb used in permission names, paired with the stored action
const VERBS: [(&str, PermissionAction); 3] = [
    ("read", PermissionAction::Read),
    ("write", PermissionAction::Update),
    ("delete", PermissionAction::Delete),
];

/// Built-in roles: name, description, system flag, granted permissions
/// (`None` grants the whole catalogue)
const ROLES: [(&str, &str, bool, Option<&[&str]>); 3] = [
    (SUPERADMIN_ROLE, "Full system access", true, None),
    (
        "admin",
        "User administration and tour management",
        false,
        Some(&["user.read", "user.write", "role.read", "tour.read", "tour.write"]),
    ),
    ("user", "Standard account", false, Some(&["tour.read"])),
];

const SUPERADMIN_EMAIL: &str = "superadmin@travelsystem.com";

/// Outcome of seeding the superadmin account
#[derive(Debug)]
pub struct SuperadminSeed {
    pub user: user::Model,
    pub created: bool,
    /// Set only when no password was supplied and one had to be generated
    pub generated_password: Option<String>,
}

/// Insert missing catalogue permissions and built-in roles
///
/// Existing rows are left untouched, so running this twice is harmless and
/// grants changed by an administrator survive a re-seed.
pub async fn seed_catalogue(conn: &impl ConnectionTrait) -> Result<(), InternalError> {
    let permissions = PermissionStore::new();
    let roles = RoleStore::new();

    let mut catalogue = Vec::new();
    for module in MODULES {
        let prefix = module.as_str().to_lowercase();
        for (verb, action) in VERBS {
            let name = format!("{}.{}", prefix, verb);
            if permissions.find_by_name(conn, &name).await?.is_none() {
                let description = format!("Allows {} access to {} records", verb, prefix);
                permissions
                    .insert(conn, name.clone(), module, action, Some(description))
                    .await?;
                tracing::info!("Seeded permission {}", name);
            }
            catalogue.push(name);
        }
    }

    for (name, description, is_system, grants) in ROLES {
        if roles.find_by_name(conn, name).await?.is_some() {
            tracing::debug!("Role {} already present, skipping", name);
            continue;
        }
        let role = roles
            .insert(conn, name.to_string(), Some(description.to_string()), is_system)
            .await?;

        let names: Vec<&str> = match grants {
            Some(grants) => grants.to_vec(),
            None => catalogue.iter().map(String::as_str).collect(),
        };
        let mut permission_ids = Vec::with_capacity(names.len());
        for permission_name in names {
            if let Some(found) = permissions.find_by_name(conn, permission_name).await? {
                permission_ids.push(found.id);
            }
        }
        roles.replace_permissions(conn, role.id, &permission_ids).await?;
        tracing::info!("Seeded role {} with {} permissions", name, permission_ids.len());
    }

    Ok(())
}

/// Create the superadmin account unless it already exists
///
/// A supplied password must satisfy the password policy. Without one a
/// random password is generated and handed back to the caller exactly once.
pub async fn seed_superadmin(
    conn: &impl ConnectionTrait,
    app_data: &AppData,
    password: Option<&str>,
) -> Result<SuperadminSeed, InternalError> {
    if let Some(existing) = app_data
        .user_store
        .find_by_username_for_update(conn, SUPERADMIN_USERNAME)
        .await?
    {
        tracing::info!("Superadmin account already exists (ID: {})", existing.id);
        return Ok(SuperadminSeed {
            user: existing,
            created: false,
            generated_password: None,
        });
    }

    let role = app_data
        .role_store
        .find_by_name(conn, SUPERADMIN_ROLE)
        .await?
        .ok_or_else(|| InternalError::from(RequestError::invalid("Superadmin role has not been seeded")))?;

    let (password, generated_password) = match password {
        Some(password) => {
            app_data
                .password_validator
                .validate(password)
                .map_err(RequestError::from)?;
            (password.to_string(), None)
        }
        None => {
            let generated = app_data.crypto_provider.generate_password();
            (generated.clone(), Some(generated))
        }
    };

    let password_hash = app_data.crypto_provider.hash_password(&password)?;
    let user = app_data
        .user_store
        .insert(
            conn,
            NewUser {
                username: SUPERADMIN_USERNAME.to_string(),
                email: SUPERADMIN_EMAIL.to_string(),
                password_hash,
                first_name: Some("Super".to_string()),
                last_name: Some("Admin".to_string()),
                display_name: Some("System Administrator".to_string()),
                phone: None,
                is_active: true,
                is_verified: true,
                created_by: None,
            },
        )
        .await?;
    app_data.user_store.replace_roles(conn, user.id, &[role.id]).await?;

    tracing::info!("Superadmin account created (ID: {})", user.id);
    Ok(SuperadminSeed {
        user,
        created: true,
        generated_password,
    })
}

/// Password from `--password`, else SUPERADMIN_PASSWORD, else none
pub fn resolve_password(explicit: Option<String>, env: &dyn EnvironmentProvider) -> Option<String> {
    explicit
        .or_else(|| env.get_var("SUPERADMIN_PASSWORD"))
        .filter(|p| !p.is_empty())
}

/// Seed everything in one transaction and report the result on stdout
pub async fn run_seed(app_data: &AppData, password: Option<String>) -> Result<(), InternalError> {
    let txn = transaction::begin(&app_data.db).await?;
    let result = async {
        seed_catalogue(&txn).await?;
        seed_superadmin(&txn, app_data, password.as_deref()).await
    }
    .await;
    let seed = transaction::complete(txn, "seed database", result).await?;
    app_data.cache.invalidate_all();

    println!("\n=== Seed complete ===\n");
    if !seed.created {
        println!("Superadmin account already present: {}", seed.user.username);
        return Ok(());
    }
    println!("Superadmin account created: {}", seed.user.username);
    if let Some(generated) = seed.generated_password {
        println!("Generated password (shown once, store it now): {}", generated);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockEnvironment;
    use crate::test::utils::setup_test_app_unseeded;

    #[test]
    fn test_flag_wins_over_environment() {
        let env = MockEnvironment::empty().with_var("SUPERADMIN_PASSWORD", "FromEnv123!");

        assert_eq!(resolve_password(Some("Flag123!".into()), &env).as_deref(), Some("Flag123!"));
        assert_eq!(resolve_password(None, &env).as_deref(), Some("FromEnv123!"));
        assert_eq!(resolve_password(None, &MockEnvironment::empty()), None);
    }

    #[tokio::test]
    async fn test_catalogue_has_fixed_ids_and_is_idempotent() {
        let app = setup_test_app_unseeded().await;
        seed_catalogue(&app.db).await.unwrap();
        seed_catalogue(&app.db).await.unwrap();

        let all = app.permission_store.all(&app.db).await.unwrap();
        assert_eq!(all.len(), 12);
        let user_write = app.permission_store.find_by_name(&app.db, "user.write").await.unwrap().unwrap();
        assert_eq!(user_write.id, 2);
        assert_eq!(user_write.module, "USER");
        assert_eq!(user_write.action, "UPDATE");

        let superadmin = app.role_store.find_snapshot(&app.db, 1).await.unwrap().unwrap();
        assert_eq!(superadmin.role.name, SUPERADMIN_ROLE);
        assert!(superadmin.role.is_system);
        assert_eq!(superadmin.permissions.len(), 12);

        let admin = app.role_store.find_snapshot(&app.db, 2).await.unwrap().unwrap();
        assert_eq!(admin.permissions.len(), 5);
    }

    #[tokio::test]
    async fn test_superadmin_seed_generates_password_once() {
        let app = setup_test_app_unseeded().await;
        seed_catalogue(&app.db).await.unwrap();

        let first = seed_superadmin(&app.db, &app, None).await.unwrap();
        assert!(first.created);
        let password = first.generated_password.unwrap();
        assert!(app.crypto_provider.verify_password(&password, &first.user.password_hash).unwrap());

        let second = seed_superadmin(&app.db, &app, None).await.unwrap();
        assert!(!second.created);
        assert!(second.generated_password.is_none());
        assert_eq!(second.user.id, first.user.id);
    }

    #[tokio::test]
    async fn test_weak_supplied_password_is_rejected() {
        let app = setup_test_app_unseeded().await;
        seed_catalogue(&app.db).await.unwrap();

        let err = seed_superadmin(&app.db, &app, Some("password")).await.unwrap_err();
        assert!(matches!(err, InternalError::Request(RequestError::WeakPassword(_))));
    }
}
