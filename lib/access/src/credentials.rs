//! Submitted login credentials and argon2 credential hashes.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use rootcause::Report;
use std::fmt;

use crate::error::CredentialError;

/// Username and password submitted through the login form.
///
/// The password is never printed; `Debug` redacts it so a request context
/// can be logged while a login is in flight.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: String,
}

impl LoginCredentials {
    /// Creates a credentials pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the submitted username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the submitted password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns true if either field was left empty.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.username.is_empty() || self.password.is_empty()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Hashes a password into an argon2 PHC string.
///
/// # Errors
///
/// Returns an error if no salt can be drawn from the OS or hashing fails.
pub fn hash_password(password: &str) -> Result<String, Report<CredentialError>> {
    let mut salt_bytes = [0u8; 16];
    getrandom::fill(&mut salt_bytes).map_err(|e| CredentialError::SaltUnavailable {
        reason: e.to_string(),
    })?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| CredentialError::HashingFailed {
        reason: e.to_string(),
    })?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError::HashingFailed {
            reason: e.to_string(),
        })?
        .to_string();
    Ok(phc)
}

/// Checks a password against a stored PHC string.
///
/// A malformed hash never verifies.
#[must_use]
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = LoginCredentials::new("admin", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn incomplete_when_a_field_is_empty() {
        assert!(LoginCredentials::new("", "secret").is_incomplete());
        assert!(LoginCredentials::new("admin", "").is_incomplete());
        assert!(!LoginCredentials::new("admin", "secret").is_incomplete());
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse"));
        assert!(!verify_password(&hash, "battery staple"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
    }
}
