use crate::errors::internal::PasswordValidationError;

/// Characters accepted as the mandatory special character
const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// Password strength policy
///
/// Validates in order and reports the first failing rule:
/// 1. Minimum length
/// 2. Lowercase letter
/// 3. Uppercase letter
/// 4. Digit
/// 5. Special character
#[derive(Debug, Clone)]
pub struct PasswordValidatorProvider {
    min_length: usize,
}

impl PasswordValidatorProvider {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn validate(&self, password: &str) -> Result<(), PasswordValidationError> {
        if password.chars().count() < self.min_length {
            return Err(PasswordValidationError::TooShort {
                min_length: self.min_length,
            });
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PasswordValidationError::MissingLowercase);
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PasswordValidationError::MissingUppercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordValidationError::MissingDigit);
        }
        if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            return Err(PasswordValidationError::MissingSpecial);
        }
        Ok(())
    }
}

impl Default for PasswordValidatorProvider {
    fn default() -> Self {
        Self::new(8)
    }
}
