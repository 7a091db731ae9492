//! HTTP API Module
//!
//! Register, login, profile and logout endpoints, with the auth gate in
//! front of the protected ones.

pub mod routes;
pub mod gate;
pub mod handlers;
pub mod server;
pub mod types;

pub use routes::TokenGateApi;
pub use gate::{auth_gate, extract_bearer, AuthenticatedUser};
pub use handlers::AppState;
pub use server::ApiServer;
pub use types::*;
