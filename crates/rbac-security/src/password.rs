//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use rbac_shared::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password must be between {min} and {max} characters")]
    InvalidLength { min: usize, max: usize },
    #[error("Hash error: {0}")]
    HashError(String),
}

pub struct PasswordService;

impl PasswordService {
    /// Hash a plain password into a PHC string. Rejects out-of-range lengths.
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        Self::check_length(password)?;

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    pub fn check_length(password: &str) -> Result<(), PasswordError> {
        let len = password.chars().count();
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
            return Err(PasswordError::InvalidLength {
                min: MIN_PASSWORD_LENGTH,
                max: MAX_PASSWORD_LENGTH,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordService::hash("abc12345").unwrap();
        assert_ne!(hash, "abc12345");
        assert!(PasswordService::verify("abc12345", &hash).unwrap());
        assert!(!PasswordService::verify("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let a = PasswordService::hash("abc12345").unwrap();
        let b = PasswordService::hash("abc12345").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_short_password() {
        assert!(matches!(
            PasswordService::hash("abc"),
            Err(PasswordError::InvalidLength { .. })
        ));
    }
}
