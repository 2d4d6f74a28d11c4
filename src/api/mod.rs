//! HTTP API: Axum web server over bracket sessions and saved brackets.
//!
//! Sessions live in memory until they are won and saved, discarded, or left
//! idle past the session TTL. Saving hands a snapshot to the configured
//! `BracketStore`.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

pub use routes::{ApiState, AppState, DEFAULT_SESSION_TTL_MINS};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState, allowed_origin: Option<&str>) -> Router {
    let origin = match allowed_origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(value) => AllowOrigin::exact(value),
        None => AllowOrigin::any(),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/categories", get(routes::list_categories))
        .route("/api/sessions", post(routes::create_session))
        .route(
            "/api/sessions/:id",
            get(routes::get_session).delete(routes::delete_session),
        )
        .route("/api/sessions/:id/selections", post(routes::select))
        .route("/api/sessions/:id/save", post(routes::save_session))
        .route("/api/brackets", get(routes::list_brackets))
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    allowed_origin: Option<&str>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(state, allowed_origin);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API address {addr}"))?;
    info!(%addr, "API server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
