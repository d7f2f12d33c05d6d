//! Password hashing
//!
//! Argon2id with a random per-password salt, stored as a PHC string.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::AppError;

/// Hash a password for storage
///
/// # Errors
/// Returns `AppError::PasswordHash` if Argon2 fails internally
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash
///
/// Returns false on mismatch. A stored hash that cannot be parsed never
/// verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::warn!(%error, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_blocking(
    password: String,
    password_hash: String,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))
}
