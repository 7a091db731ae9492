//! TokenGate Library
//!
//! Credential authentication for HTTP APIs with store-backed bearer sessions.
//!
//! A user holds at most one live session token. Tokens are signed JWTs, but
//! liveness is decided by two reciprocal entries in a key-value store
//! (`token:<token>` and `user_token:<username>`), so logging in again or
//! logging out takes effect immediately.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod session;
pub mod shutdown;

pub use config::Config;
pub use error::AuthError;
pub use session::SessionManager;
pub use shutdown::ShutdownCoordinator;

/// Common error type for bootstrap and configuration
pub type Result<T> = anyhow::Result<T>;
