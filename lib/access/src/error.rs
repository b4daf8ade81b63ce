//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthenticationError`: a login attempt was refused
//! - `CredentialError`: password hashing failures
//! - `StoreError`: session persistence failures
//! - `GateError`: failures that abort request gating

use std::fmt;

/// Errors from login attempts.
///
/// A refused login is a normal outcome for the gate, not a fault. The
/// message returned by [`AuthenticationError::user_message`] is the only
/// text that may be shown to the person signing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Unknown username, wrong password, or an empty field.
    InvalidCredentials,
    /// The account exists but has been deactivated.
    AccountInactive { username: String },
    /// The principal directory could not be queried.
    DirectoryUnavailable { reason: String },
}

impl AuthenticationError {
    /// Returns the message surfaced to the user.
    ///
    /// Inactive accounts share the wrong-password message so the response
    /// does not reveal which usernames exist.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials | Self::AccountInactive { .. } => {
                "The account sign-in was incorrect or your account is disabled temporarily. \
                 Please wait and try again later."
            }
            Self::DirectoryUnavailable { .. } => {
                "Sign-in is temporarily unavailable. Please try again later."
            }
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::AccountInactive { username } => {
                write!(f, "account '{username}' is inactive")
            }
            Self::DirectoryUnavailable { reason } => {
                write!(f, "principal directory unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from hashing a password for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No salt could be generated.
    SaltUnavailable { reason: String },
    /// The hasher rejected the input or parameters.
    HashingFailed { reason: String },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SaltUnavailable { reason } => write!(f, "salt generation failed: {reason}"),
            Self::HashingFailed { reason } => write!(f, "password hashing failed: {reason}"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Errors from session and principal persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage rejected the operation.
    StorageFailed { reason: String },
    /// A stored record could not be encoded or decoded.
    Serialization { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => write!(f, "storage failed: {reason}"),
            Self::Serialization { reason } => {
                write!(f, "record serialization failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors that abort request gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The principal directory failed while reloading a principal.
    Directory { reason: String },
    /// The request was rewritten more times than the dispatch loop allows.
    ForwardLimitExceeded { limit: usize },
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory { reason } => write!(f, "principal directory error: {reason}"),
            Self::ForwardLimitExceeded { limit } => {
                write!(f, "request forwarded more than {limit} times")
            }
        }
    }
}

impl std::error::Error for GateError {}
