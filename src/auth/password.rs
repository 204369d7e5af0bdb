//! Argon2 password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

use super::AuthError;

/// Hashes a plain-text password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            error!(error = %err, "Password hashing failed");
            AuthError::InternalError("Password hashing failed".to_string())
        })
}

/// Checks a password against a stored hash; `Ok(false)` on mismatch.
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|err| {
        error!(error = %err, "Stored password hash is malformed");
        AuthError::InternalError("Invalid stored password hash".to_string())
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => {
            error!(error = %err, "Password verification failed");
            Err(AuthError::InternalError(
                "Password verification failed".to_string(),
            ))
        }
    }
}
