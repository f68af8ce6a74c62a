mod database;
mod env_provider;
mod errors;
mod logging;
mod secret_manager;
mod settings;

pub use database::{init_database, migrate_database};
pub use env_provider::{EnvironmentProvider, SystemEnvironment};
#[cfg(test)]
pub use env_provider::MockEnvironment;
pub use errors::SettingsError;
pub use logging::{init_logging, LoggingError};
pub use secret_manager::{SecretError, SecretManager};
pub use settings::{AppSettings, RuntimeEnvironment};
