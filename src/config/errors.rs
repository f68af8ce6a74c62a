use std::fmt;

/// Invalid configuration value supplied through the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    InvalidFormat {
        setting_name: String,
        expected: String,
        actual: String,
    },
    OutOfRange {
        setting_name: String,
        min: String,
        max: String,
        actual: String,
    },
}

impl SettingsError {
    pub fn invalid_format(setting_name: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidFormat {
            setting_name: setting_name.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat {
                setting_name,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Setting '{}' has invalid format. Expected: {}, got: {}",
                    setting_name, expected, actual
                )
            }
            Self::OutOfRange {
                setting_name,
                min,
                max,
                actual,
            } => {
                write!(
                    f,
                    "Setting '{}' must be between {} and {}, got {}",
                    setting_name, min, max, actual
                )
            }
        }
    }
}

impl std::error::Error for SettingsError {}
