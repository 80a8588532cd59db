//! API endpoints for the simulation service

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

mod markets;
mod simulate;

use crate::sandbox::config::SimulatorConfig;
use crate::sandbox::runner::SimulatorHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SimulatorConfig>,
    pub simulator: SimulatorHandle,
}

impl AppState {
    pub fn new(config: Arc<SimulatorConfig>, simulator: SimulatorHandle) -> Self {
        Self { config, simulator }
    }
}

/// Create the API router with all endpoints
pub fn router(config: Arc<SimulatorConfig>, simulator: SimulatorHandle) -> Router {
    let app_state = AppState::new(config, simulator);

    Router::new()
        .route("/markets", get(markets::list_markets))
        .route("/simulate", post(simulate::simulate))
        .with_state(app_state)
}
