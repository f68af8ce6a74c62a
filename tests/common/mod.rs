// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use rbac_backend::app_data::AppData;
use rbac_backend::cli::seed;
use rbac_backend::config::{AppSettings, RuntimeEnvironment, SecretManager};
use rbac_backend::stores::NewUser;
use rbac_backend::types::db::user;
use rbac_backend::types::internal::context::{RequestContext, RequestSource};

pub const SUPERADMIN_PASSWORD: &str = "Admin123!";
pub const USER_PASSWORD: &str = "Secret123!";

pub const ADMIN_ROLE_ID: i32 = 2;
pub const USER_ROLE_ID: i32 = 3;

/// Creates a test database with migrations applied
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Fully wired application over a seeded in-memory database
pub async fn setup_app() -> Arc<AppData> {
    setup_app_with(AppSettings::default()).await
}

/// Same as `setup_app`, starting from caller-supplied settings
pub async fn setup_app_with(settings: AppSettings) -> Arc<AppData> {
    let db = setup_test_db().await;
    let settings = AppSettings {
        environment: RuntimeEnvironment::Test,
        argon2_memory_kib: 64,
        argon2_iterations: 1,
        ..settings
    };
    let secrets = SecretManager::new(
        "integration-secret-key-at-least-32-characters".to_string(),
        "integration-pepper-value".to_string(),
    )
    .expect("Failed to create secrets");

    let app = Arc::new(AppData::from_parts(db, settings, secrets).expect("Failed to build AppData"));
    seed::seed_catalogue(&app.db).await.expect("Failed to seed catalogue");
    app
}

/// Seed the superadmin account with the well-known test password
pub async fn seed_superadmin(app: &AppData) -> user::Model {
    seed::seed_superadmin(&app.db, app, Some(SUPERADMIN_PASSWORD))
        .await
        .expect("Failed to seed superadmin")
        .user
}

/// Insert a user with `USER_PASSWORD` directly through the store
pub async fn create_user(app: &AppData, username: &str, role_ids: &[i32]) -> user::Model {
    let password_hash = app
        .crypto_provider
        .hash_password(USER_PASSWORD)
        .expect("Failed to hash password");
    let created = app
        .user_store
        .insert(
            &app.db,
            NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash,
                first_name: Some("Test".to_string()),
                last_name: Some("User".to_string()),
                display_name: None,
                phone: None,
                is_active: true,
                is_verified: true,
                created_by: None,
            },
        )
        .await
        .expect("Failed to create user");
    app.user_store
        .replace_roles(&app.db, created.id, role_ids)
        .await
        .expect("Failed to assign roles");
    created
}

/// Request context acting as `user_id`
pub fn as_user(user_id: i32) -> RequestContext {
    RequestContext::for_actor(user_id, RequestSource::API)
}

/// Reload a user row straight from the database
pub async fn reload(app: &AppData, id: i32) -> user::Model {
    app.user_store
        .find_by_id(&app.db, id)
        .await
        .expect("Failed to load user")
        .expect("User disappeared")
}
