//! API Types

use crate::error::AuthError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::SystemTime;
use tracing::{error, warn};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub timestamp: SystemTime,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data: Some(data),
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn error(message: impl Into<String>, error: Value) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
            error: Some(error),
            timestamp: SystemTime::now(),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data: None,
            error: None,
            timestamp: SystemTime::now(),
        }
    }
}

/// Register and login request body.
///
/// Missing fields default to empty so they are reported as validation
/// errors rather than as undecodable JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub session_store: String,
    pub uptime_seconds: u64,
    pub version: String,
}

impl AuthError {
    /// HTTP status for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Malformed(_) => StatusCode::BAD_REQUEST,
            AuthError::UsernameTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::SigningFailure(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AuthError::Validation(fields) => ApiResponse::<()>::error(
                "Validation failed",
                serde_json::to_value(fields).unwrap_or(Value::Null),
            ),
            AuthError::Malformed(detail) => {
                ApiResponse::error("Could not process request body", Value::String(detail.clone()))
            }
            AuthError::UsernameTaken => {
                ApiResponse::error("Username is already taken", Value::from("Conflict occurred"))
            }
            AuthError::InvalidCredentials => ApiResponse::error(
                "Invalid username or password",
                Value::from("Invalid credentials"),
            ),
            AuthError::InvalidToken | AuthError::Unauthorized => {
                ApiResponse::error("Unauthorized", Value::from("Unauthorized access"))
            }
            AuthError::StoreUnavailable(e) => {
                warn!("Responding 503: {}", e);
                ApiResponse::error(
                    "Service temporarily unavailable",
                    Value::from("Session store unavailable"),
                )
            }
            AuthError::SigningFailure(_) | AuthError::Internal(_) => {
                error!("Responding 500: {}", self);
                ApiResponse::error("Internal server error", Value::from("Internal server error"))
            }
        };

        let mut response = (status, Json(body)).into_response();
        if self.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
