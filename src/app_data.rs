use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::cache::CacheLayer;
use crate::config::{AppSettings, SecretManager};
use crate::errors::InternalError;
use crate::providers::{
    CryptoProvider, IdentityProvider, InputValidatorProvider, PasswordValidatorProvider,
    TokenProvider,
};
use crate::stores::{PermissionStore, RoleStore, UserStore};

/// Centralized application data following the main-owned stores pattern
///
/// Everything here is created once in main.rs and shared across coordinators,
/// so every coordinator sees the same cache instance and the same secrets.
///
/// # Architecture
///
/// ```text
/// main.rs
///   ↓
/// AppData::init()
///   ↓ creates once
///   ├─ db (DatabaseConnection)
///   ├─ settings (Arc<AppSettings>)
///   ├─ secret_manager (Arc<SecretManager>)
///   ├─ user_store / role_store / permission_store
///   ├─ cache (Arc<CacheLayer>)
///   └─ token / crypto / identity / validator providers
///   ↓ wrapped in Arc<AppData>
///   ↓ passed to coordinators
///   ├─ AuthCoordinator::new(app_data)
///   ├─ UserCoordinator::new(app_data)
///   ├─ RoleCoordinator::new(app_data)
///   └─ PermissionCoordinator::new(app_data)
/// ```
pub struct AppData {
    pub db: DatabaseConnection,
    pub settings: Arc<AppSettings>,
    pub secret_manager: Arc<SecretManager>,
    pub user_store: Arc<UserStore>,
    pub role_store: Arc<RoleStore>,
    pub permission_store: Arc<PermissionStore>,
    pub cache: Arc<CacheLayer>,
    pub token_provider: Arc<TokenProvider>,
    pub crypto_provider: Arc<CryptoProvider>,
    pub identity_provider: Arc<IdentityProvider>,
    pub password_validator: Arc<PasswordValidatorProvider>,
    pub input_validator: Arc<InputValidatorProvider>,
}

impl AppData {
    /// Initialize all application data
    ///
    /// The database should be connected and migrated before calling this.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` when secret manager initialization fails
    pub fn init(db: DatabaseConnection, settings: AppSettings) -> Result<Self, InternalError> {
        tracing::info!("Initializing AppData...");

        tracing::debug!("Initializing secret manager...");
        let secret_manager = SecretManager::init()
            .map_err(|e| InternalError::parse("secret_manager", format!("Secret manager init failed: {}", e)))?;
        tracing::debug!("Secret manager initialized");

        Self::from_parts(db, settings, secret_manager)
    }

    /// Assemble from an already loaded secret manager
    pub fn from_parts(
        db: DatabaseConnection,
        settings: AppSettings,
        secret_manager: SecretManager,
    ) -> Result<Self, InternalError> {
        let settings = Arc::new(settings);
        let secret_manager = Arc::new(secret_manager);

        tracing::debug!("Creating stores...");
        let user_store = Arc::new(UserStore::new());
        let role_store = Arc::new(RoleStore::new());
        let permission_store = Arc::new(PermissionStore::new());
        tracing::debug!("Stores created");

        let cache = Arc::new(CacheLayer::new(
            settings.user_cache_capacity,
            settings.role_cache_capacity,
        ));
        tracing::debug!(
            "Cache layer created (users: {}, roles: {})",
            settings.user_cache_capacity,
            settings.role_cache_capacity
        );

        let token_provider = Arc::new(TokenProvider::new(secret_manager.clone(), &settings));
        let crypto_provider = Arc::new(CryptoProvider::new(secret_manager.clone(), &settings)?);
        let identity_provider = Arc::new(IdentityProvider::new(
            db.clone(),
            user_store.clone(),
            cache.clone(),
        ));
        let password_validator = Arc::new(PasswordValidatorProvider::new(settings.password_min_length));
        let input_validator = Arc::new(InputValidatorProvider::new());

        tracing::info!("AppData initialization complete");

        Ok(Self {
            db,
            settings,
            secret_manager,
            user_store,
            role_store,
            permission_store,
            cache,
            token_provider,
            crypto_provider,
            identity_provider,
            password_validator,
            input_validator,
        })
    }
}
