//! API Handlers

use super::gate::AuthenticatedUser;
use super::types::*;
use crate::auth::{AuthManager, UserProfile};
use crate::error::AuthError;
use crate::session::SessionManager;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub start_time: SystemTime,
}

impl AppState {
    pub fn new(auth: Arc<AuthManager>) -> Self {
        Self {
            auth,
            start_time: SystemTime::now(),
        }
    }

    pub fn sessions(&self) -> SessionManager {
        self.auth.sessions().clone()
    }
}

fn body(payload: Result<Json<CredentialsRequest>, JsonRejection>) -> Result<CredentialsRequest, AuthError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| AuthError::Malformed(rejection.body_text()))
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .unwrap_or_default()
        .as_secs();

    let store_ok = state.auth.sessions().store_healthy().await;
    let health = HealthStatus {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        session_store: if store_ok { "reachable" } else { "unreachable" }.to_string(),
        uptime_seconds: uptime,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success("Service status", health))
}

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), AuthError> {
    let request = body(payload)?;
    let profile = state.auth.register(&request.username, &request.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered", profile)),
    ))
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    let request = body(payload)?;
    let token = state.auth.login(&request.username, &request.password).await?;

    Ok(Json(ApiResponse::success("Login successful", LoginResponse { token })))
}

/// Profile of the authenticated user
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserProfile>>, AuthError> {
    let profile = state.auth.me(&user.username).await?;
    Ok(Json(ApiResponse::success("Current user", profile)))
}

/// Revoke the session the request was made with
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<()>>, AuthError> {
    state.auth.logout(&user.username, &user.token).await?;
    info!("User '{}' logged out", user.username);
    Ok(Json(ApiResponse::ok("Logged out")))
}
