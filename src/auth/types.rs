//! Authentication Types

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

pub type UserId = u64;

/// Stored user record
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub created_at: SystemTime,
}

/// User record about to be created
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub username: String,
    pub password_hash: String,
}

/// Public view of a user, safe to return to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub created_at: SystemTime,
}

impl From<&Credential> for UserProfile {
    fn from(credential: &Credential) -> Self {
        Self {
            user_id: credential.user_id,
            username: credential.username.clone(),
            created_at: credential.created_at,
        }
    }
}
