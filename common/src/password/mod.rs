//! Password hashing capability
//!
//! Accounts store an opaque credential hash; withdraw and transfer verify the
//! raw credential against it. The trait keeps the hashing scheme injectable
//! so tests can substitute a cheap encoder.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{Error, Result};

/// Hashing and verification of account passwords
pub trait PasswordEncoder: Send + Sync {
    /// Hash a raw password into an opaque stored form
    fn hash(&self, raw: &str) -> Result<String>;

    /// Check a raw password against a stored hash
    fn matches(&self, raw: &str, hashed: &str) -> bool;
}

/// Argon2id password encoder producing PHC-format hash strings
#[derive(Debug, Default)]
pub struct Argon2PasswordEncoder;

impl Argon2PasswordEncoder {
    /// Create a new encoder with the default Argon2id parameters
    pub fn new() -> Self {
        Self
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn hash(&self, raw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| Error::PasswordHash(format!("failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn matches(&self, raw: &str, hashed: &str) -> bool {
        match PasswordHash::new(hashed) {
            Ok(parsed) => Argon2::default()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok(),
            // An unparseable stored hash can never match
            Err(_) => false,
        }
    }
}
