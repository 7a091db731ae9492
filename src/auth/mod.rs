//! Authentication Module
//!
//! User accounts, password checks and the login/logout flow.

pub mod credentials;
pub mod manager;
pub mod password;
pub mod types;

pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use manager::AuthManager;
pub use types::{Credential, NewCredential, UserId, UserProfile};
