//! Authentication Manager
//!
//! Register, login, profile lookup and logout on top of a
//! [`CredentialStore`] and the [`SessionManager`].

use super::credentials::CredentialStore;
use super::password;
use super::types::{NewCredential, UserProfile};
use crate::error::AuthError;
use crate::session::SessionManager;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_FIELD_LEN: usize = 255;

/// Coordinates credential checks with session issuance
#[derive(Clone)]
pub struct AuthManager {
    credentials: Arc<dyn CredentialStore>,
    sessions: SessionManager,
    hash_iterations: u32,
}

impl AuthManager {
    pub fn new(credentials: Arc<dyn CredentialStore>, sessions: SessionManager, hash_iterations: u32) -> Self {
        Self {
            credentials,
            sessions,
            hash_iterations,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Create a user account
    pub async fn register(&self, username: &str, password: &str) -> Result<UserProfile, AuthError> {
        validate_credentials(username, password)?;

        if self.credentials.find_by_username(username).await?.is_some() {
            debug!("Registration rejected, username '{}' exists", username);
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hash(password).await?;
        self.credentials
            .create(NewCredential {
                username: username.to_string(),
                password_hash,
            })
            .await?;

        let record = self
            .credentials
            .find_by_username(username)
            .await?
            .ok_or_else(|| AuthError::Internal(format!("user '{}' missing after create", username)))?;

        info!("Registered user '{}'", username);
        Ok(UserProfile::from(&record))
    }

    /// Check credentials and start a session, returning its token
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        validate_credentials(username, password)?;

        let record = self.credentials.find_by_username(username).await?;
        let stored_hash = record.as_ref().map(|r| r.password_hash.clone());
        if !self.check_password(password, stored_hash).await? {
            warn!("Failed login for user '{}'", username);
            return Err(AuthError::InvalidCredentials);
        }

        self.sessions.issue(username).await
    }

    /// Profile of the user behind an authenticated request
    pub async fn me(&self, username: &str) -> Result<UserProfile, AuthError> {
        match self.credentials.find_by_username(username).await? {
            Some(record) => Ok(UserProfile::from(&record)),
            // The session outlived the account
            None => Err(AuthError::InvalidToken),
        }
    }

    /// End the caller's session
    pub async fn logout(&self, username: &str, token: &str) -> Result<(), AuthError> {
        if self.credentials.find_by_username(username).await?.is_none() {
            return Err(AuthError::InvalidToken);
        }
        self.sessions.revoke(token, username).await
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let iterations = self.hash_iterations;
        tokio::task::spawn_blocking(move || password::hash_password(&password, iterations))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {}", e)))
    }

    /// Unknown users still pay for a hash so timing does not reveal them
    async fn check_password(&self, password: &str, stored_hash: Option<String>) -> Result<bool, AuthError> {
        let password = password.to_string();
        let iterations = self.hash_iterations;
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(stored) => password::verify_password(&password, &stored),
            None => {
                password::dummy_verify(&password, iterations);
                false
            }
        })
        .await
        .map_err(|e| AuthError::Internal(format!("password check task failed: {}", e)))
    }
}

/// Required-field and length checks shared by register and login
pub fn validate_credentials(username: &str, password: &str) -> Result<(), AuthError> {
    let mut errors = BTreeMap::new();

    if username.is_empty() {
        errors.insert("username".to_string(), "username is required".to_string());
    } else if username.chars().count() > MAX_FIELD_LEN {
        errors.insert(
            "username".to_string(),
            format!("username must be at most {} characters", MAX_FIELD_LEN),
        );
    } else if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        errors.insert(
            "username".to_string(),
            "username must not contain whitespace".to_string(),
        );
    }

    if password.is_empty() {
        errors.insert("password".to_string(), "password is required".to_string());
    } else if password.chars().count() > MAX_FIELD_LEN {
        errors.insert(
            "password".to_string(),
            format!("password must be at most {} characters", MAX_FIELD_LEN),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}
