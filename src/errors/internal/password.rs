use thiserror::Error;

/// First failed password-strength rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordValidationError {
    #[error("Password must be at least {min_length} characters long")]
    TooShort { min_length: usize },

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one number")]
    MissingDigit,

    #[error("Password must contain at least one special character")]
    MissingSpecial,
}
