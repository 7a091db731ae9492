//! Session Store Interface

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a session store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Key-value store holding live sessions.
///
/// Implementations must be safe to call from many tasks at once. Deleting
/// an absent key is not an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a value, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a value that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a key
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Reverse entry: token -> username
pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

/// Forward entry: username -> token
pub fn user_token_key(username: &str) -> String {
    format!("user_token:{}", username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_schema() {
        assert_eq!(token_key("abc.def.ghi"), "token:abc.def.ghi");
        assert_eq!(user_token_key("alice"), "user_token:alice");
    }
}
