//! # Password Hashing Capability
//!
//! The core never names a hashing algorithm. Anything that turns a plaintext
//! password into a stored credential goes through [`PasswordHasher`], which
//! the application wires to a real backend (argon2 in `stockroom-api`).

use thiserror::Error;

/// Failure reported by a hashing backend.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PasswordHashError(pub String);

/// Pluggable one-way hashing for user credentials.
pub trait PasswordHasher: Send + Sync {
    /// Produces a self-describing hash string for storage.
    fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError>;

    /// Checks a plaintext password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch. `Err` is reserved for hashes the
    /// backend cannot parse.
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordHashError>;
}
