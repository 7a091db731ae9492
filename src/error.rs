//! Error Types
//!
//! Every failure the authentication flow can report is a variant of
//! [`AuthError`]. The HTTP layer maps it to a status code in exactly one
//! place (see `api::types`), so handlers never inspect error strings.

use crate::session::StoreError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Authentication and session errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password at login
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Token is missing from the store, expired, forged, or unreadable
    #[error("invalid token")]
    InvalidToken,

    /// The session store failed or timed out
    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The token could not be signed
    #[error("failed to sign token: {0}")]
    SigningFailure(String),

    /// The request body could not be decoded
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("username is already taken")]
    UsernameTaken,

    /// Field name -> message
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),

    /// No usable bearer credential was presented
    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_))
    }
}
