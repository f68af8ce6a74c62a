// Test utilities shared across unit tests
// Only compiled when running tests

use std::sync::{Arc, Mutex};

use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use crate::app_data::AppData;
use crate::cli::seed;
use crate::config::{AppSettings, RuntimeEnvironment, SecretManager};
use crate::stores::NewUser;
use crate::types::db::user;

pub const TEST_JWT_SECRET: &str = "test-secret-key-minimum-32-characters-long";
pub const TEST_PEPPER: &str = "test-pepper-for-unit-tests";

/// Fresh in-memory database with every migration applied
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Seed the permission catalogue and the built-in roles
///
/// Ids are stable on a fresh database: roles superadmin=1, admin=2, user=3;
/// permissions `{user,role,permission,tour}.{read,write,delete}` = 1..=12.
pub async fn seed_catalogue(db: &DatabaseConnection) {
    seed::seed_catalogue(db)
        .await
        .expect("Failed to seed catalogue");
}

/// Settings tuned for tests: cheap argon2, test environment
pub fn test_settings() -> AppSettings {
    AppSettings {
        database_url: "sqlite::memory:".to_string(),
        environment: RuntimeEnvironment::Test,
        argon2_memory_kib: 64,
        argon2_iterations: 1,
        ..AppSettings::default()
    }
}

/// AppData over a migrated but empty database
pub async fn setup_test_app_unseeded() -> Arc<AppData> {
    let db = setup_test_db().await;
    let secrets = SecretManager::new(TEST_JWT_SECRET.to_string(), TEST_PEPPER.to_string())
        .expect("Failed to create test secrets");

    Arc::new(AppData::from_parts(db, test_settings(), secrets).expect("Failed to build AppData"))
}

/// AppData over a migrated database with the catalogue seeded
pub async fn setup_test_app() -> Arc<AppData> {
    let app = setup_test_app_unseeded().await;
    seed_catalogue(&app.db).await;
    app
}

/// Row template for store-level tests; the hash is not a real argon2 hash
pub fn test_new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: "not-a-real-hash".to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        display_name: None,
        phone: None,
        is_active: true,
        is_verified: false,
        created_by: None,
    }
}

/// Insert an active user with a real password hash and the given roles
///
/// Goes straight to the store, so no permission checks or input rules apply.
pub async fn create_test_user(app: &AppData, username: &str, password: &str, role_ids: &[i32]) -> user::Model {
    let mut new_user = test_new_user(username);
    new_user.password_hash = app
        .crypto_provider
        .hash_password(password)
        .expect("Failed to hash password");

    let created = app
        .user_store
        .insert(&app.db, new_user)
        .await
        .expect("Failed to create test user");
    app.user_store
        .replace_roles(&app.db, created.id, role_ids)
        .await
        .expect("Failed to assign roles");
    created
}

/// Create the superadmin account with a known password
pub async fn seed_superadmin(app: &AppData, password: &str) -> user::Model {
    seed::seed_superadmin(&app.db, app, Some(password))
        .await
        .expect("Failed to seed superadmin")
        .user
}

/// Helper to manage environment variables in tests
///
/// Cleans up specified environment variables on creation and drop,
/// ensuring test isolation when dealing with global environment state.
pub struct EnvGuard {
    vars: Vec<String>,
}

impl EnvGuard {
    pub fn new(vars: Vec<&str>) -> Self {
        // Clean up before setting new values
        for var in &vars {
            unsafe {
                std::env::remove_var(var);
            }
        }
        Self {
            vars: vars.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for var in &self.vars {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }
}

/// Global mutex for tests that modify environment variables
///
/// Environment variables are process-global, so tests that modify them
/// must run serially to avoid race conditions.
pub static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());
