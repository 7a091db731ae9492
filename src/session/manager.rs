//! Session Manager
//!
//! Issues, verifies and revokes session tokens. A session is two entries in
//! the store:
//!
//! - `token:<token>` -> username, consulted on every verification
//! - `user_token:<username>` -> token, used to invalidate the previous
//!   session when the user logs in again
//!
//! The two keys are written one after the other without a transaction.
//! Two concurrent logins for the same user both succeed; the last writer of
//! the forward key wins, and the other token stays valid until its TTL runs
//! out. That overlap is bounded by [`SESSION_LIFETIME`] and is accepted.
//!
//! The manager keeps no mutable state of its own. Every store call is
//! bounded by `store_timeout` and is never retried here.

use super::codec::TokenCodec;
use super::store::{token_key, user_token_key, SessionStore, StoreError};
use crate::error::AuthError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifetime of a session token and of both store entries
pub const SESSION_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Orchestrates the session lifecycle against a [`SessionStore`]
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: Arc<TokenCodec>,
    store_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, codec: Arc<TokenCodec>, store_timeout: Duration) -> Self {
        Self {
            store,
            codec,
            store_timeout,
        }
    }

    /// Start a new session for `username`, invalidating the previous one
    pub async fn issue(&self, username: &str) -> Result<String, AuthError> {
        let token = self
            .codec
            .encode(username, SESSION_LIFETIME)
            .map_err(|e| AuthError::SigningFailure(e.to_string()))?;

        let forward_key = user_token_key(username);
        let previous = self
            .bounded(self.store.get(&forward_key))
            .await
            .map_err(|e| store_failure("read previous session", username, e))?;

        if let Some(previous) = previous.filter(|previous| *previous != token) {
            self.bounded(self.store.delete(&token_key(&previous)))
                .await
                .map_err(|e| store_failure("invalidate previous session", username, e))?;
            debug!("Invalidated previous session for user '{}'", username);
        }

        // From here on the old session is gone; a failure below leaves the
        // user logged out rather than with two sessions.
        self.bounded(self.store.set_with_ttl(&token_key(&token), username, SESSION_LIFETIME))
            .await
            .map_err(|e| store_failure("store token", username, e))?;

        self.bounded(self.store.set_with_ttl(&forward_key, &token, SESSION_LIFETIME))
            .await
            .map_err(|e| store_failure("update user token mapping", username, e))?;

        info!("Issued session token for user '{}'", username);
        Ok(token)
    }

    /// Resolve a token to the username it is bound to.
    ///
    /// Every failure is reported as [`AuthError::InvalidToken`]: a forged,
    /// expired, revoked or unknown token looks the same to the caller as a
    /// store outage.
    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.codec.decode(token).map_err(|e| {
            debug!("Rejected token: {}", e);
            AuthError::InvalidToken
        })?;

        match self.bounded(self.store.get(&token_key(token))).await {
            Ok(Some(username)) if username == claims.username => Ok(username),
            Ok(Some(username)) => {
                warn!(
                    "Session entry for '{}' does not match token subject '{}'",
                    username, claims.username
                );
                Err(AuthError::InvalidToken)
            }
            Ok(None) => {
                debug!("No live session for token of user '{}'", claims.username);
                Err(AuthError::InvalidToken)
            }
            Err(e) => {
                warn!("Session lookup failed during verification: {}", e);
                Err(AuthError::InvalidToken)
            }
        }
    }

    /// End the session binding `token` to `username`.
    ///
    /// Idempotent. The pair is trusted as given, normally the identity the
    /// auth gate resolved from this very token.
    pub async fn revoke(&self, token: &str, username: &str) -> Result<(), AuthError> {
        self.bounded(self.store.delete(&user_token_key(username)))
            .await
            .map_err(|e| store_failure("revoke user token", username, e))?;

        self.bounded(self.store.delete(&token_key(token)))
            .await
            .map_err(|e| store_failure("revoke token", username, e))?;

        info!("Revoked session for user '{}'", username);
        Ok(())
    }

    /// Whether the session store answers within the timeout
    pub async fn store_healthy(&self) -> bool {
        match self.bounded(self.store.ping()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Session store health check failed: {}", e);
                false
            }
        }
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }
}

fn store_failure(action: &str, username: &str, err: StoreError) -> AuthError {
    error!("Failed to {} for user '{}': {}", action, username, err);
    AuthError::StoreUnavailable(err)
}
