//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;

/// Shortest signing secret accepted, in bytes
pub const MIN_SECRET_LEN: usize = 16;

/// Minimum PBKDF2 iteration count accepted
pub const MIN_HASH_ITERATIONS: u32 = 1_000;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, layered over environment and defaults
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::load_layered(path, |name| std::env::var(name).ok())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then environment overrides, then the keys the file sets
    fn load_layered<F>(path: &Path, env: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_overrides_from(env)?;

        if !path.exists() {
            tracing::warn!("Configuration file not found at {}, using environment and defaults", path.display());
            config.validate()?;
            return Ok(config);
        }

        tracing::info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let file: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let mut merged = match toml::Value::try_from(&config)
            .context("Failed to serialize base configuration")?
        {
            toml::Value::Table(table) => table,
            _ => bail!("Base configuration did not serialize to a table"),
        };
        merge_tables(&mut merged, file);

        let config: Config = toml::Value::Table(merged)
            .try_into()
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .context("Configuration validation failed")?;

        tracing::info!("Configuration loaded and validated successfully");
        Ok(config)
    }
}

/// Overlay `incoming` onto `base`, recursing into nested tables
fn merge_tables(base: &mut toml::Table, incoming: toml::Table) {
    for (key, value) in incoming {
        match value {
            toml::Value::Table(table) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, table),
                _ => {
                    base.insert(key, toml::Value::Table(table));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

impl Config {
    /// Override fields from `TOKENGATE_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    fn apply_overrides_from<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = env("TOKENGATE_BIND_ADDR") {
            self.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid TOKENGATE_BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(backend) = env("TOKENGATE_STORE_BACKEND") {
            self.session.backend = backend;
        }

        if let Some(redis_url) = env("TOKENGATE_REDIS_URL") {
            self.session.redis_url = redis_url;
        }

        if let Some(timeout) = env("TOKENGATE_STORE_TIMEOUT") {
            self.session.store_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid TOKENGATE_STORE_TIMEOUT: {}", timeout))?;
        }

        if let Some(iterations) = env("TOKENGATE_HASH_ITERATIONS") {
            self.auth.hash_iterations = iterations
                .parse::<u32>()
                .with_context(|| format!("Invalid TOKENGATE_HASH_ITERATIONS: {}", iterations))?;
        }

        if let Some(log_level) = env("TOKENGATE_LOG_LEVEL") {
            self.monitoring.log_level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_session_config()
            .with_context(|| "Session configuration validation failed")?;

        self.validate_auth_config()
            .with_context(|| "Authentication configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.shutdown_timeout.as_secs() > 300 {
            bail!("shutdown_timeout cannot exceed 5 minutes");
        }

        Ok(())
    }

    fn validate_session_config(&self) -> Result<()> {
        if !["redis", "memory"].contains(&self.session.backend.as_str()) {
            bail!("session.backend must be 'redis' or 'memory'");
        }

        if self.session.backend == "redis"
            && !(self.session.redis_url.starts_with("redis://")
                || self.session.redis_url.starts_with("rediss://"))
        {
            bail!("session.redis_url must start with redis:// or rediss://");
        }

        if self.session.store_timeout.is_zero() {
            bail!("store_timeout must be greater than 0");
        }

        if self.session.store_timeout.as_secs() > 60 {
            bail!("store_timeout cannot exceed 1 minute");
        }

        if let Some(secret) = &self.session.jwt_secret {
            if secret.len() < MIN_SECRET_LEN {
                bail!("jwt_secret must be at least {} bytes", MIN_SECRET_LEN);
            }
        }

        if self.session.jwt_secret_env.is_empty() {
            bail!("jwt_secret_env cannot be empty");
        }

        Ok(())
    }

    fn validate_auth_config(&self) -> Result<()> {
        if self.auth.hash_iterations < MIN_HASH_ITERATIONS {
            bail!("hash_iterations must be at least {}", MIN_HASH_ITERATIONS);
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!("monitoring.log_level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// The token signing secret, from the file or the named environment variable
    pub fn resolve_jwt_secret(&self) -> Result<String> {
        if let Some(secret) = &self.session.jwt_secret {
            return Ok(secret.clone());
        }

        let name = &self.session.jwt_secret_env;
        let secret = std::env::var(name)
            .with_context(|| format!("No jwt_secret configured and {} is not set", name))?;
        if secret.len() < MIN_SECRET_LEN {
            bail!("{} must be at least {} bytes", name, MIN_SECRET_LEN);
        }
        Ok(secret)
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        memory_store: bool,
    ) -> Result<()> {
        if let Some(bind_str) = bind {
            let addr = bind_str
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid bind address: {}", bind_str))?;
            self.server.bind_addr = addr;
            tracing::info!("CLI override: bind address set to {}", addr);
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if memory_store {
            self.session.backend = "memory".to_string();
            tracing::info!("CLI override: using in-memory session store");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tokengate.toml");
        fs::write(
            &config_path,
            r#"
[server]
bind_addr = "0.0.0.0:9000"
shutdown_timeout = "10s"

[session]
backend = "memory"
redis_url = "redis://cache:6379/1"
store_timeout = "500ms"
jwt_secret = "file-secret-0123456789abcdef"
jwt_secret_env = "TOKENGATE_JWT_SECRET"

[monitoring]
log_level = "debug"
"#,
        )
        .unwrap();

        let config = ConfigManager::load_layered(&config_path, no_env).unwrap();
        assert_eq!(config.server.bind_addr.port(), 9000);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.session.backend, "memory");
        assert_eq!(config.session.store_timeout, Duration::from_millis(500));
        assert_eq!(config.monitoring.log_level, "debug");
        // Missing section falls back to defaults
        assert_eq!(config.auth.hash_iterations, crate::auth::password::DEFAULT_ITERATIONS);
        assert_eq!(
            config.resolve_jwt_secret().unwrap(),
            "file-secret-0123456789abcdef"
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigManager::load_layered(&temp_dir.path().join("absent.toml"), no_env).unwrap();
        assert_eq!(config.session.backend, "redis");
    }

    #[test]
    fn test_env_fills_keys_the_file_leaves_out() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tokengate.toml");
        fs::write(&config_path, "[monitoring]\nlog_level = \"warn\"\n").unwrap();

        let env = |name: &str| match name {
            "TOKENGATE_STORE_BACKEND" => Some("memory".to_string()),
            "TOKENGATE_LOG_LEVEL" => Some("debug".to_string()),
            _ => None,
        };
        let config = ConfigManager::load_layered(&config_path, env).unwrap();

        assert_eq!(config.session.backend, "memory");
        // Keys the file does set win over the environment
        assert_eq!(config.monitoring.log_level, "warn");
        // Untouched keys keep their defaults
        assert_eq!(config.session.store_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_file_overrides_env_within_a_section() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tokengate.toml");
        fs::write(&config_path, "[session]\nstore_timeout = \"750ms\"\n").unwrap();

        let env = |name: &str| match name {
            "TOKENGATE_STORE_TIMEOUT" => Some("5s".to_string()),
            "TOKENGATE_REDIS_URL" => Some("redis://cache:6380/2".to_string()),
            _ => None,
        };
        let config = ConfigManager::load_layered(&config_path, env).unwrap();

        assert_eq!(config.session.store_timeout, Duration::from_millis(750));
        assert_eq!(config.session.redis_url, "redis://cache:6380/2");
    }

    #[test]
    fn test_missing_file_still_applies_env() {
        let temp_dir = TempDir::new().unwrap();
        let env = |name: &str| (name == "TOKENGATE_HASH_ITERATIONS").then(|| "5000".to_string());

        let config = ConfigManager::load_layered(&temp_dir.path().join("absent.toml"), env).unwrap();
        assert_eq!(config.auth.hash_iterations, 5000);
    }

    #[test]
    fn test_invalid_env_value_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let env = |name: &str| (name == "TOKENGATE_STORE_TIMEOUT").then(|| "soon".to_string());

        assert!(ConfigManager::load_layered(&temp_dir.path().join("absent.toml"), env).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.session.backend = "memcached".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.store_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.jwt_secret = Some("short".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.hash_iterations = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.redis_url = "http://localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monitoring.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config
            .merge_with_cli_args(Some("0.0.0.0:7000"), Some(7100), true)
            .unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:7100".parse().unwrap());
        assert_eq!(config.session.backend, "memory");

        let mut config = Config::default();
        assert!(config
            .merge_with_cli_args(Some("not-an-address"), None, false)
            .is_err());
        assert_eq!(config.server.bind_addr, Config::default().server.bind_addr);
    }

    #[test]
    fn test_secret_from_named_env_var() {
        let mut config = Config::default();
        config.session.jwt_secret_env = "TOKENGATE_TEST_SECRET_FROM_ENV".to_string();

        assert!(config.resolve_jwt_secret().is_err());

        std::env::set_var("TOKENGATE_TEST_SECRET_FROM_ENV", "env-secret-0123456789abcdef");
        assert_eq!(config.resolve_jwt_secret().unwrap(), "env-secret-0123456789abcdef");
        std::env::remove_var("TOKENGATE_TEST_SECRET_FROM_ENV");
    }
}
