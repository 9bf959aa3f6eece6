//! # Persuade Node
//!
//! Persuasion-challenge node binary: durable game store, background game
//! loop, and operator API for manual post / check / reward triggers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use persuade_core::{GameSettings, RetryPolicy};
use persuade_engine::Engine;
use persuade_state::JsonGameStore;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod adapters;
mod api;
mod runner;
mod state;

use runner::GameLoop;
use state::AppState;

/// Run the node: open the store, start the game loop, serve the API.
pub async fn run_server(settings: GameSettings) -> anyhow::Result<()> {
    let store = Arc::new(JsonGameStore::open(&settings.data_dir).await?);

    let engine = Arc::new(Engine::new(
        store.clone(),
        Arc::new(adapters::UnconfiguredSocial),
        Arc::new(adapters::UnconfiguredScoring),
        Arc::new(adapters::UnconfiguredChain),
        settings.clone(),
        RetryPolicy::default(),
    ));

    let (manual_tx, manual_rx) = mpsc::channel(32);
    let game_loop = GameLoop::new(
        engine,
        manual_rx,
        Duration::from_secs(settings.tick_interval_secs),
    );
    tokio::spawn(game_loop.run());

    let app_state = AppState::new(store, settings.clone(), manual_tx);
    let app = create_router(app_state);

    let addr: SocketAddr = settings
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", settings.listen_addr))?;
    info!("🌐 Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Challenge API
        .route("/api/v1/challenge", get(api::challenge::get_challenge))
        .route("/api/v1/challenge", post(api::challenge::trigger_post))
        .route(
            "/api/v1/challenge/check",
            post(api::challenge::trigger_check),
        )
        .route(
            "/api/v1/challenge/reward",
            post(api::challenge::trigger_reward),
        )
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Load settings from the path in `PERSUADE_CONFIG` (default persuade.json).
fn load_settings() -> anyhow::Result<GameSettings> {
    let path =
        std::env::var("PERSUADE_CONFIG").unwrap_or_else(|_| "persuade.json".to_string());
    let bytes =
        std::fs::read(&path).with_context(|| format!("failed to read config file {}", path))?;
    let settings: GameSettings =
        serde_json::from_slice(&bytes).with_context(|| format!("invalid config in {}", path))?;
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Persuade node starting...");
    let settings = load_settings()?;
    run_server(settings).await
}
