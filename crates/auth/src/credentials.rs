//! Password hashing.
//!
//! Plaintext enters as a validated [`Password`] and leaves only as an
//! opaque [`PasswordHash`] in PHC string format.

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash as PhcHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use roster_core::Password;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Stored credential. Never contains the plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps a hash loaded from storage.
    pub fn from_stored(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

/// One-way password hashing seam.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &Password) -> Result<PasswordHash, CredentialError>;

    /// `false` for a wrong password and for an unreadable hash alike.
    fn verify(&self, candidate: &str, hash: &PasswordHash) -> bool;
}

impl<H: CredentialHasher + ?Sized> CredentialHasher for std::sync::Arc<H> {
    fn hash(&self, password: &Password) -> Result<PasswordHash, CredentialError> {
        (**self).hash(password)
    }

    fn verify(&self, candidate: &str, hash: &PasswordHash) -> bool {
        (**self).verify(candidate, hash)
    }
}

/// Argon2id with the crate's default parameters and a fresh 16-byte salt.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &Password) -> Result<PasswordHash, CredentialError> {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        Argon2::default()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| PasswordHash(hash.to_string()))
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    fn verify(&self, candidate: &str, hash: &PasswordHash) -> bool {
        let parsed = match PhcHash::new(hash.as_str()) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is not a valid PHC string");
                return false;
            }
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(raw: &str) -> Password {
        Password::parse(raw).unwrap()
    }

    #[test]
    fn hash_verifies_only_the_original() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash(&password("correct horse battery")).unwrap();

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse battery", &hash));
        assert!(!hasher.verify("wrong horse battery", &hash));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = Argon2Hasher::new();
        let a = hasher.hash(&password("same password")).unwrap();
        let b = hasher.hash(&password("same password")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        let hasher = Argon2Hasher::new();
        assert!(!hasher.verify("anything", &PasswordHash::from_stored("not-a-hash")));
    }

    #[test]
    fn debug_hides_hash() {
        let hash = PasswordHash::from_stored("$argon2id$v=19$secret");
        assert_eq!(format!("{hash:?}"), "PasswordHash([REDACTED])");
    }
}
