use std::path::{Path, PathBuf};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{EnvironmentProvider, SystemEnvironment};

/// Noisy dependencies are capped at `warn` unless LOG_LEVEL names them explicitly.
const DEPENDENCY_DIRECTIVES: &str = "sqlx=warn,sea_orm=warn,poem=info";

/// Logging configuration read from LOG_LEVEL and APP_LOG_FILE
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
    pub app_log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn from_env_provider(env: &dyn EnvironmentProvider) -> Self {
        Self {
            log_level: env.get_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            app_log_file: env.get_var("APP_LOG_FILE").map(PathBuf::from),
        }
    }

    fn filter_directives(&self) -> String {
        if self.log_level.contains('=') {
            self.log_level.clone()
        } else {
            format!("{},{}", self.log_level.to_lowercase(), DEPENDENCY_DIRECTIVES)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationError(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("File system error: {0}")]
    FileSystemError(#[from] std::io::Error),
}

/// Install the global tracing subscriber
///
/// Console output is always on; a daily-rolling file is added when
/// APP_LOG_FILE is set.
pub fn init_logging() -> Result<(), LoggingError> {
    let config = LoggingConfig::from_env_provider(&SystemEnvironment);

    let directives = config.filter_directives();
    let env_filter = EnvFilter::try_new(&directives)
        .map_err(|e| LoggingError::InvalidLogLevel(format!("{}: {}", config.log_level, e)))?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter.clone());

    let subscriber = tracing_subscriber::registry().with(console_layer);

    let Some(log_file_path) = &config.app_log_file else {
        return subscriber
            .try_init()
            .map_err(|e| LoggingError::InitializationError(e.to_string()));
    };

    let directory = log_file_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;
    let file_name = log_file_path
        .file_name()
        .ok_or_else(|| LoggingError::InitializationError("Invalid log file path".to_string()))?;

    let file_layer = fmt::layer()
        .with_writer(tracing_appender::rolling::daily(directory, file_name))
        .with_target(true)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    subscriber
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::InitializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockEnvironment;

    #[test]
    fn test_plain_level_gets_dependency_caps() {
        let config = LoggingConfig::from_env_provider(&MockEnvironment::empty().with_var("LOG_LEVEL", "DEBUG"));

        assert_eq!(config.filter_directives(), format!("debug,{}", DEPENDENCY_DIRECTIVES));
        assert!(config.app_log_file.is_none());
    }

    #[test]
    fn test_explicit_directives_are_kept() {
        let config = LoggingConfig::from_env_provider(
            &MockEnvironment::empty()
                .with_var("LOG_LEVEL", "rbac_backend=trace,sqlx=info")
                .with_var("APP_LOG_FILE", "logs/app.log"),
        );

        assert_eq!(config.filter_directives(), "rbac_backend=trace,sqlx=info");
        assert_eq!(config.app_log_file, Some(PathBuf::from("logs/app.log")));
    }
}
