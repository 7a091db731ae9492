//! Configuration Types

use crate::auth::password::DEFAULT_ITERATIONS;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Session store and token signing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// "redis" or "memory"
    pub backend: String,
    pub redis_url: String,
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
    /// Signing secret; prefer `jwt_secret_env` outside development
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    /// Environment variable holding the signing secret
    pub jwt_secret_env: String,
}

/// Credential handling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub hash_iterations: u32,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: "redis".to_string(),
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            store_timeout: Duration::from_secs(2),
            jwt_secret: None,
            jwt_secret_env: "TOKENGATE_JWT_SECRET".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hash_iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
