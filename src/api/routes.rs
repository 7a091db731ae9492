//! API Routes

use super::{
    gate::auth_gate,
    handlers::*,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// HTTP API router
pub struct TokenGateApi;

impl TokenGateApi {
    /// Create the API router
    pub fn create_router(state: AppState) -> Router {
        // Public routes (no authentication required)
        let public_routes = Router::new()
            .route("/health", get(health_check))
            .route("/register", post(register))
            .route("/login", post(login));

        // Protected routes (bearer token required)
        let protected_routes = Router::new()
            .route("/me", get(me))
            .route("/logout", post(logout))
            .route_layer(middleware::from_fn_with_state(state.sessions(), auth_gate));

        Router::new()
            .merge(public_routes)
            .merge(protected_routes)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}
