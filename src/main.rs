//! Goal Bracket server.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the configured bracket store and identity, and serves the JSON
//! API until Ctrl+C.

use anyhow::{Context, Result};
use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use goal_bracket::api::{self, ApiState};
use goal_bracket::config::{AppConfig, StorageBackend};
use goal_bracket::engine::XorShiftRng;
use goal_bracket::identity::StaticIdentity;
use goal_bracket::storage::{BracketService, BracketStore, HttpBracketStore, JsonFileStore};
use goal_bracket::types::Principal;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("GOAL_BRACKET_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        backend = ?cfg.storage.backend,
        port = cfg.server.port,
        "Goal Bracket starting up"
    );

    let store = build_store(&cfg)?;

    let principal = cfg.principal_id().map(Principal::new);
    match &principal {
        Some(p) => info!(principal = %p, "Signed in"),
        None => warn!(
            env = %cfg.identity.principal_env,
            "No principal configured; saving and listing brackets will be refused"
        ),
    }
    let identity = Arc::new(StaticIdentity::new(principal));

    let service = BracketService::new(store, identity);
    info!(store = service.store_name(), ttl_mins = cfg.server.session_ttl_mins, "Bracket service ready");
    let state = Arc::new(
        ApiState::new(service, Box::new(XorShiftRng::from_entropy()))
            .with_session_ttl(Duration::minutes(cfg.server.session_ttl_mins)),
    );

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", cfg.server.host, cfg.server.port))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received.");
    };

    api::serve(state, addr, cfg.server.allowed_origin.as_deref(), shutdown).await?;

    info!("Goal Bracket shut down cleanly.");
    Ok(())
}

/// Build the configured `BracketStore`.
fn build_store(cfg: &AppConfig) -> Result<Arc<dyn BracketStore>> {
    let store: Arc<dyn BracketStore> = match cfg.storage.backend {
        StorageBackend::File => {
            let store = JsonFileStore::new(cfg.storage.path.as_deref());
            info!(path = %store.path().display(), "Using file bracket store");
            Arc::new(store)
        }
        StorageBackend::Remote => {
            let endpoint = cfg
                .storage
                .endpoint
                .as_deref()
                .context("storage.endpoint is required for the remote backend")?;
            let token = cfg.api_token();
            if token.is_none() {
                warn!("No API token for the remote bracket store; requests will be unauthenticated");
            }
            info!(endpoint, "Using remote bracket store");
            Arc::new(HttpBracketStore::new(endpoint, token, cfg.storage.timeout_secs)?)
        }
    };
    Ok(store)
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("goal_bracket=info"));

    let json_logging = std::env::var("GOAL_BRACKET_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
