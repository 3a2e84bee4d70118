//! Password hashing via bcrypt.
//!
//! Hashes are salted by the library, so hashing the same password twice
//! yields different strings; comparison must always go through
//! [`verify_password`].

use anyhow::{Context, Result};

/// Hash a password with bcrypt at the library's default cost.
///
/// # Errors
/// Returns an error if the hashing backend fails (not reachable for
/// ordinary UTF-8 input).
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("failed to hash password")
}

/// Verify a password against a stored bcrypt hash.
///
/// Returns `false` on mismatch and on malformed stored hashes; user input
/// can never make this panic or error.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
