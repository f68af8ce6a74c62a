// Providers layer - Work performers and business logic
//
// Providers contain business logic and provide composable operations that
// coordinators can orchestrate: token signing, password hashing and policy,
// input checks and authorization decisions.

pub mod authorization_provider;
pub mod crypto_provider;
pub mod identity_provider;
pub mod input_validator_provider;
pub mod password_validator_provider;
pub mod token_provider;

// Re-export providers for clean imports
pub use authorization_provider::{AuthorizationEvaluator, MatchMode};
pub use crypto_provider::CryptoProvider;
pub use identity_provider::IdentityProvider;
pub use input_validator_provider::InputValidatorProvider;
pub use password_validator_provider::PasswordValidatorProvider;
pub use token_provider::TokenProvider;
