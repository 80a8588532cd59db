//! AMM Swap Sandbox Backend
//!
//! HTTP API server simulating swaps across SolFi SOL/USDC markets on an
//! in-process LiteSVM ledger seeded from exported mainnet account state.

use anyhow::Context;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amm_swap_sandbox::api;
use amm_swap_sandbox::sandbox::config::{Settings, SimulatorConfig};
use amm_swap_sandbox::sandbox::runner;
use amm_swap_sandbox::sandbox::state_loader::SimulationAssets;
use amm_swap_sandbox::sandbox::swap_simulator::SwapSimulator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Loads .env before reading variables
    let settings = Settings::from_env().context("invalid environment settings")?;
    let config = SimulatorConfig::mainnet().with_settings(&settings);

    tracing::info!(
        "Simulating program {} on {} markets ({} / {})",
        config.program_id,
        config.markets.len(),
        config.pair.native.symbol,
        config.pair.paired.symbol
    );
    for (i, market) in config.markets.iter().enumerate() {
        tracing::info!("  [{}] {}", i, market);
    }

    let assets = SimulationAssets::load(&settings);
    let config = Arc::new(config);

    tracing::info!("Spawning simulator thread...");
    let (handle, ready_rx) =
        runner::spawn_simulator_thread(SwapSimulator::new((*config).clone(), assets));

    match ready_rx.await {
        Ok(Ok(())) => tracing::info!("Simulator thread ready"),
        Ok(Err(e)) => return Err(e.context("simulator thread setup failed")),
        Err(_) => anyhow::bail!("simulator thread dropped ready channel"),
    }

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::router(config, handle))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid BIND_ADDR: {}", settings.bind_addr))?;
    tracing::info!("Starting server on {}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health       - Health check");
    tracing::info!("  GET  /api/markets  - List simulated markets");
    tracing::info!("  POST /api/simulate - Simulate a swap on every market");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
