//! Marine Server - route hazard scanning and grid routing backend
//!
//! Provides:
//! - REST API for route scans and their diagnostics
//! - Least-time route search over a bounded lattice
//! - Background reload of the hazard snapshot

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marine_server::{api, config::Config, reload, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("marine_server=debug".parse()?))
        .init();

    tracing::info!("Starting Marine Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let state = Arc::new(AppState::new(config.clone()));

    if let Some(path) = config.hazard_snapshot.clone() {
        reload::load_snapshot(&state, path).await?;
    } else {
        tracing::warn!("MARINE_HAZARD_SNAPSHOT not set; scanning against an empty hazard store");
    }

    let app = Router::new()
        .merge(api::routes())
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
