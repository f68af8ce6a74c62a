use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;

use crate::config::{AppSettings, SecretManager};
use crate::errors::InternalError;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// Length of generated account passwords
pub const GENERATED_PASSWORD_LENGTH: usize = 12;

/// Password hashing and generation
///
/// Hashes are Argon2id with the password pepper passed as the Argon2 secret,
/// so a leaked database alone is not enough to run an offline attack.
pub struct CryptoProvider {
    secret_manager: Arc<SecretManager>,
    params: Params,
}

impl CryptoProvider {
    pub fn new(secret_manager: Arc<SecretManager>, settings: &AppSettings) -> Result<Self, InternalError> {
        let params = Params::new(
            settings.argon2_memory_kib,
            settings.argon2_iterations,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| InternalError::crypto("argon2_params", e.to_string()))?;

        Ok(Self { secret_manager, params })
    }

    fn argon2(&self) -> Result<Argon2<'_>, InternalError> {
        Argon2::new_with_secret(
            self.secret_manager.password_pepper().as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| InternalError::crypto("argon2_init", format!("Failed to initialize Argon2 with secret: {}", e)))
    }

    /// Hash a password with a fresh salt
    pub fn hash_password(&self, password: &str) -> Result<String, InternalError> {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| InternalError::crypto("hash_password", format!("Password hashing error: {}", e)))
    }

    /// `Ok(false)` on mismatch; an unparsable stored hash is an error
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, InternalError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| InternalError::crypto("parse_password_hash", e.to_string()))?;
        Ok(self
            .argon2()?
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Random password with at least one character of every required class
    pub fn generate_password(&self) -> String {
        generate_password(GENERATED_PASSWORD_LENGTH)
    }
}

/// Random password of `length` (at least 4) characters, shuffled after
/// seeding one lowercase, uppercase, digit and symbol character
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::rng();
    let mut pick = |set: &[u8]| set[rng.random_range(0..set.len())];

    let mut chars = vec![pick(UPPERCASE), pick(LOWERCASE), pick(DIGITS), pick(SYMBOLS)];
    let all: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
    while chars.len() < length {
        chars.push(pick(&all));
    }

    chars.shuffle(&mut rand::rng());
    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(pepper: &str) -> CryptoProvider {
        let secrets = Arc::new(
            SecretManager::new("test-secret-key-minimum-32-characters-long".to_string(), pepper.to_string())
                .expect("valid test secrets"),
        );
        let settings = AppSettings {
            argon2_memory_kib: 64,
            argon2_iterations: 1,
            ..AppSettings::default()
        };
        CryptoProvider::new(secrets, &settings).expect("valid argon2 params")
    }

    #[test]
    fn test_hash_then_verify() {
        let crypto = provider("test-pepper-for-unit-tests");
        let hash = crypto.hash_password("Admin123!").unwrap();

        assert!(hash.starts_with("$argon2id"));
        assert!(crypto.verify_password("Admin123!", &hash).unwrap());
        assert!(!crypto.verify_password("admin123!", &hash).unwrap());
    }

    #[test]
    fn test_pepper_is_part_of_the_hash() {
        let hash = provider("pepper-one-secret-key").hash_password("Admin123!").unwrap();

        assert!(!provider("pepper-two-secret-key").verify_password("Admin123!", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let crypto = provider("test-pepper-for-unit-tests");
        assert!(crypto.verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn test_generated_password_covers_every_class() {
        for _ in 0..50 {
            let password = generate_password(GENERATED_PASSWORD_LENGTH);
            assert_eq!(password.len(), 12);
            assert!(password.chars().any(|c| c.is_ascii_lowercase()));
            assert!(password.chars().any(|c| c.is_ascii_uppercase()));
            assert!(password.chars().any(|c| c.is_ascii_digit()));
            assert!(password.chars().any(|c| "!@#$%^&*".contains(c)));
        }
    }
}
