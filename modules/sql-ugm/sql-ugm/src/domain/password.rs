//! Salted password hashing.
//!
//! Stored form: `base64(sha256(plain || salt) || salt)`. The salt length is not
//! stored; it is recovered positionally, so it must stay fixed for every hash a
//! deployment verifies.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const DEFAULT_SALT_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    salt_len: usize,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_SALT_LEN)
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new(salt_len: usize) -> Self {
        Self { salt_len }
    }

    #[must_use]
    pub fn salt_len(&self) -> usize {
        self.salt_len
    }

    /// Hash `plain` with a fresh random salt.
    #[must_use]
    pub fn hash(&self, plain: &str) -> String {
        let mut salt = vec![0u8; self.salt_len];
        rand::rng().fill_bytes(&mut salt);
        STANDARD.encode(salted_digest(plain, &salt))
    }

    /// Check `plain` against a stored hash in constant time.
    ///
    /// Stored values that are not valid base64 or are shorter than the salt
    /// never verify.
    #[must_use]
    pub fn verify(&self, plain: &str, stored: &str) -> bool {
        let Ok(decoded) = STANDARD.decode(stored.trim()) else {
            return false;
        };
        let Some(split) = decoded.len().checked_sub(self.salt_len) else {
            return false;
        };
        let expected = salted_digest(plain, &decoded[split..]);
        expected.as_slice().ct_eq(decoded.as_slice()).into()
    }
}

/// `sha256(plain || salt) || salt`
fn salted_digest(plain: &str, salt: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    hasher.update(salt);
    let mut out = hasher.finalize().to_vec();
    out.extend_from_slice(salt);
    out
}
