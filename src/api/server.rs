//! API Server

use super::{handlers::AppState, routes::TokenGateApi};
use crate::auth::AuthManager;
use crate::Result;
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// HTTP server for the authentication API
pub struct ApiServer {
    bind_addr: SocketAddr,
    app_state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(bind_addr: SocketAddr, auth: Arc<AuthManager>) -> Self {
        Self {
            bind_addr,
            app_state: AppState::new(auth),
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = TokenGateApi::create_router(self.app_state);

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", self.bind_addr))?;

        info!("API server listening on {}", self.bind_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("API server error")?;

        info!("API server stopped");
        Ok(())
    }

    /// Create a router for testing
    pub fn create_test_router(&self) -> Router {
        TokenGateApi::create_router(self.app_state.clone())
    }
}
