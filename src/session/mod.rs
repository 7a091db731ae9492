//! Session Module
//!
//! Token issuance, verification and revocation against a key-value store.

pub mod codec;
pub mod manager;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use codec::{Claims, TokenCodec, TokenError};
pub use manager::{SessionManager, SESSION_LIFETIME};
pub use memory::MemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use store::{token_key, user_token_key, SessionStore, StoreError};
