//! Password hashing via bcrypt.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt hash: {0}")]
    Hash(String),

    #[error("bcrypt verify: {0}")]
    Verify(String),
}

const DUMMY_PLAINTEXT: &str = "buyncon-timing-equalizer";

/// Hash a password with a fresh salt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(password, cost).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(|e| PasswordError::Verify(e.to_string()))
}

/// Placeholder hash for logins against unknown usernames. It must share the
/// cost of real hashes so both rejection paths take the same time.
pub fn dummy_hash(cost: u32) -> Result<String, PasswordError> {
    hash_password(DUMMY_PLAINTEXT, cost)
}

/// Burn one bcrypt verification without a real credential.
pub fn verify_dummy(password: &str, dummy: &str) {
    let _ = bcrypt::verify(password, dummy);
}

/// Work factor encoded in a `$2b$NN$...` hash.
pub fn hash_cost(hash: &str) -> Option<u32> {
    hash.split('$').nth(2)?.parse().ok()
}
