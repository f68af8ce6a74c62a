use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use chrono::Duration;

use crate::config::{EnvironmentProvider, SettingsError, SystemEnvironment};

/// Deployment mode; only affects how much detail unexpected errors expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    Development,
    Production,
    Test,
}

impl RuntimeEnvironment {
    pub fn exposes_error_details(&self) -> bool {
        !matches!(self, RuntimeEnvironment::Production)
    }
}

impl FromStr for RuntimeEnvironment {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(SettingsError::invalid_format(
                "APP_ENV",
                "development, production or test",
                other,
            )),
        }
    }
}

impl Display for RuntimeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

/// Runtime configuration
///
/// Every value has a default and can be overridden through the environment;
/// see `from_env_provider` for the variable names.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub environment: RuntimeEnvironment,

    pub token_issuer: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub reset_token_ttl_minutes: i64,

    pub max_login_attempts: i32,
    pub password_min_length: usize,

    pub user_cache_capacity: usize,
    pub role_cache_capacity: usize,

    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://rbac.db?mode=rwc".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            environment: RuntimeEnvironment::Development,
            token_issuer: "rbac-backend".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            reset_token_ttl_minutes: 60,
            max_login_attempts: 5,
            password_min_length: 8,
            user_cache_capacity: 500,
            role_cache_capacity: 100,
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
        }
    }
}

impl AppSettings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_env_provider(&SystemEnvironment)
    }

    /// Load settings, falling back to defaults for unset variables
    ///
    /// # Errors
    /// Returns `SettingsError` naming the first variable that fails to parse or
    /// lies outside its accepted range
    pub fn from_env_provider(env: &dyn EnvironmentProvider) -> Result<Self, SettingsError> {
        let defaults = Self::default();
        let reader = SettingReader { env };

        let environment = match env.get_var("APP_ENV") {
            Some(value) => value.parse()?,
            None => defaults.environment,
        };

        Ok(Self {
            database_url: reader.string("DATABASE_URL", defaults.database_url),
            server_host: reader.string("HOST", defaults.server_host),
            server_port: reader.number("PORT", defaults.server_port, 1, u16::MAX)?,
            environment,
            token_issuer: reader.string("TOKEN_ISSUER", defaults.token_issuer),
            access_token_ttl_minutes: reader.number(
                "ACCESS_TOKEN_TTL_MINUTES",
                defaults.access_token_ttl_minutes,
                1,
                24 * 60,
            )?,
            refresh_token_ttl_days: reader.number(
                "REFRESH_TOKEN_TTL_DAYS",
                defaults.refresh_token_ttl_days,
                1,
                365,
            )?,
            reset_token_ttl_minutes: reader.number(
                "RESET_TOKEN_TTL_MINUTES",
                defaults.reset_token_ttl_minutes,
                1,
                24 * 60,
            )?,
            max_login_attempts: reader.number(
                "MAX_LOGIN_ATTEMPTS",
                defaults.max_login_attempts,
                1,
                100,
            )?,
            password_min_length: reader.number(
                "PASSWORD_MIN_LENGTH",
                defaults.password_min_length,
                4,
                128,
            )?,
            user_cache_capacity: reader.number(
                "USER_CACHE_CAPACITY",
                defaults.user_cache_capacity,
                1,
                1_000_000,
            )?,
            role_cache_capacity: reader.number(
                "ROLE_CACHE_CAPACITY",
                defaults.role_cache_capacity,
                1,
                1_000_000,
            )?,
            argon2_memory_kib: reader.number(
                "ARGON2_MEMORY_KIB",
                defaults.argon2_memory_kib,
                8,
                1024 * 1024,
            )?,
            argon2_iterations: reader.number(
                "ARGON2_ITERATIONS",
                defaults.argon2_iterations,
                1,
                16,
            )?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_ttl_minutes)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::minutes(self.reset_token_ttl_minutes)
    }
}

struct SettingReader<'a> {
    env: &'a dyn EnvironmentProvider,
}

impl SettingReader<'_> {
    fn string(&self, name: &str, default: String) -> String {
        self.env
            .get_var(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    fn number<T>(&self, name: &str, default: T, min: T, max: T) -> Result<T, SettingsError>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let Some(raw) = self.env.get_var(name) else {
            return Ok(default);
        };

        let value: T = raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::invalid_format(name, "an integer", &raw))?;

        if value < min || value > max {
            return Err(SettingsError::OutOfRange {
                setting_name: name.to_string(),
                min: min.to_string(),
                max: max.to_string(),
                actual: value.to_string(),
            });
        }

        Ok(value)
    }
}
