//! TokenGate - credential authentication service
//!
//! Registers users, checks passwords and hands out single-session bearer
//! tokens whose liveness is tracked in Redis.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokengate::{
    api::ApiServer,
    auth::{AuthManager, MemoryCredentialStore},
    config::{Config, ConfigManager},
    session::{MemorySessionStore, RedisSessionStore, SessionStore, TokenCodec},
    SessionManager, ShutdownCoordinator,
};

const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for TokenGate
#[derive(Parser, Debug)]
#[command(name = "tokengate")]
#[command(about = "TokenGate - credential authentication with single-session bearer tokens")]
#[command(version)]
#[command(long_about = "
TokenGate - credential authentication with single-session bearer tokens

Configuration priority (highest to lowest):
1. Command-line arguments
2. Keys set in the configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  TOKENGATE_BIND_ADDR        - Bind address (e.g., 127.0.0.1:8000)
  TOKENGATE_STORE_BACKEND    - Session store backend (redis, memory)
  TOKENGATE_REDIS_URL        - Redis URL (e.g., redis://127.0.0.1:6379/0)
  TOKENGATE_STORE_TIMEOUT    - Per-call store timeout (e.g., 2s, 500ms)
  TOKENGATE_HASH_ITERATIONS  - PBKDF2 iterations for new password hashes
  TOKENGATE_LOG_LEVEL        - Log level (trace, debug, info, warn, error)
  TOKENGATE_JWT_SECRET       - Token signing secret (name configurable)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "tokengate.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 127.0.0.1:8000)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Keep sessions in process memory instead of Redis
    #[arg(long, help = "Use the in-memory session store (single node, development)")]
    pub memory_store: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Priority: CLI args > keys set in the file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(args.bind.as_deref(), args.port, args.memory_store)?;

    config
        .validate()
        .context("Final configuration validation failed")?;

    init_tracing(&args, &config.monitoring.log_level)?;
    info!("Starting TokenGate v{}", env!("CARGO_PKG_VERSION"));

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  Session store: {}", config.session.backend);
        info!("  Store timeout: {:?}", config.session.store_timeout);
        info!("  Hash iterations: {}", config.auth.hash_iterations);
        return Ok(());
    }

    let secret = config.resolve_jwt_secret()?;
    let store = build_session_store(&config).await?;
    let codec = Arc::new(TokenCodec::new(secret.as_bytes()));
    let sessions = SessionManager::new(store, codec, config.session.store_timeout);

    let credentials = Arc::new(MemoryCredentialStore::new());
    let auth = Arc::new(AuthManager::new(
        credentials,
        sessions,
        config.auth.hash_iterations,
    ));

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);
    let server = ApiServer::new(config.server.bind_addr, auth);
    let server_shutdown = shutdown_coordinator.shutdown_signal();

    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.start(server_shutdown).await {
            error!("API server error: {:#}", e);
        }
    });

    info!("TokenGate started on {}", config.server.bind_addr);
    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    tokio::select! {
        result = shutdown_coordinator.listen_for_signals() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
            }
        }
        _ = &mut server_handle => {
            warn!("API server exited before a shutdown signal");
            return Ok(());
        }
    }

    info!("Initiating graceful shutdown...");
    match tokio::time::timeout(shutdown_coordinator.timeout(), &mut server_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server task failed: {}", e),
        Err(_) => {
            warn!(
                "In-flight requests did not finish within {:?}, aborting",
                shutdown_coordinator.timeout()
            );
            server_handle.abort();
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Build the configured session store
async fn build_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    match config.session.backend.as_str() {
        "memory" => {
            warn!("Using in-memory session store; sessions are lost on restart");
            let store = Arc::new(MemorySessionStore::new());
            store.spawn_sweeper(MEMORY_SWEEP_INTERVAL);
            Ok(store)
        }
        _ => {
            let store = RedisSessionStore::connect(&config.session.redis_url, config.session.store_timeout)
                .await
                .context("Failed to connect to Redis session store")?;
            Ok(Arc::new(store))
        }
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins over everything else.
fn init_tracing(args: &CliArgs, configured_level: &str) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or(configured_level)
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
