//! Credential Store

use super::types::{Credential, NewCredential, UserId};
use crate::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::debug;

/// Lookup and creation of user records
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError>;

    /// Fails with [`AuthError::UsernameTaken`] when the username exists
    async fn create(&self, credential: NewCredential) -> Result<UserId, AuthError>;
}

#[derive(Debug, Default)]
struct Users {
    by_username: HashMap<String, Credential>,
    next_id: UserId,
}

/// User records held in process memory
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: RwLock<Users>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError> {
        Ok(self.users.read().await.by_username.get(username).cloned())
    }

    async fn create(&self, credential: NewCredential) -> Result<UserId, AuthError> {
        let mut users = self.users.write().await;
        if users.by_username.contains_key(&credential.username) {
            return Err(AuthError::UsernameTaken);
        }

        users.next_id += 1;
        let user_id = users.next_id;
        let record = Credential {
            user_id,
            username: credential.username.clone(),
            password_hash: credential.password_hash,
            created_at: SystemTime::now(),
        };
        users.by_username.insert(credential.username, record);

        debug!("Created user record {}", user_id);
        Ok(user_id)
    }
}
