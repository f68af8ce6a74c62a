use thiserror::Error;

/// Login and password-change rejections (HTTP 401)
///
/// An unknown username and a wrong password share `InvalidCredentials` so the
/// response never reveals which check failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is deactivated. Please contact administrator")]
    AccountDeactivated,

    #[error("Account is locked. Please contact administrator")]
    AccountLocked,

    #[error("Current password is incorrect")]
    IncorrectPassword,
}
