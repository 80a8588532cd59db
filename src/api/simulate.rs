//! Simulation endpoint
//!
//! Runs one swap per configured market on a fresh ledger and returns the
//! per-market outputs.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::api::AppState;
use crate::sandbox::config::SwapDirection;
use crate::sandbox::swap_simulator::{SimulationOptions, SwapRequest, SwapResult};
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    /// `sol_to_token` / `token_to_sol` (aliases: `buy` / `sell`)
    pub direction: String,
    /// Human units of the source token
    pub amount: Option<f64>,
    pub slot: Option<u64>,
    #[serde(default)]
    pub ignore_errors: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub run_id: String,
    pub direction: SwapDirection,
    pub input_token: String,
    pub output_token: String,
    pub input_amount: f64,
    pub succeeded: usize,
    pub failed: usize,
    pub execution_time_ms: u64,
    pub results: Vec<SwapResult>,
}

impl SimulateRequest {
    fn into_swap_request(self) -> ApiResult<SwapRequest> {
        let direction = SwapDirection::from_str(&self.direction).ok_or_else(|| {
            ApiError::BadRequest(format!("Invalid direction: {}", self.direction))
        })?;
        Ok(SwapRequest {
            direction,
            amount: self.amount,
            slot: self.slot,
        })
    }
}

/// POST /api/simulate - Simulate the swap on every configured market
pub async fn simulate(
    State(state): State<AppState>,
    Json(req): Json<SimulateRequest>,
) -> ApiResult<Json<SimulateResponse>> {
    let run_id = Uuid::new_v4();
    let options = SimulationOptions {
        ignore_errors: req.ignore_errors,
        print_results: false,
        run_id: Some(run_id),
    };
    let request = req.into_swap_request()?;

    let direction = request.direction;
    let input_amount = request.human_amount();
    let source = direction.source(&state.config.pair).symbol.clone();
    let destination = direction.destination(&state.config.pair).symbol.clone();

    tracing::info!(
        "Simulation {} requested: {} {} -> {}",
        run_id,
        input_amount,
        source,
        destination
    );

    let start = Instant::now();
    let results = state.simulator.simulate(request, options).await?;
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    tracing::info!(
        "Simulation {} finished in {}ms: {}/{} markets succeeded",
        run_id,
        execution_time_ms,
        succeeded,
        results.len()
    );

    Ok(Json(SimulateResponse {
        run_id: run_id.to_string(),
        direction,
        input_token: source,
        output_token: destination,
        input_amount,
        succeeded,
        failed: results.len() - succeeded,
        execution_time_ms,
        results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_direction_aliases() {
        let req: SimulateRequest =
            serde_json::from_str(r#"{"direction": "sell", "amount": 250.0}"#).unwrap();
        let swap = req.into_swap_request().unwrap();
        assert_eq!(swap.direction, SwapDirection::TokenToSol);
        assert_eq!(swap.human_amount(), 250.0);
    }

    #[test]
    fn test_request_rejects_unknown_direction() {
        let req: SimulateRequest =
            serde_json::from_str(r#"{"direction": "sideways"}"#).unwrap();
        assert!(matches!(
            req.into_swap_request(),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_ignore_errors_defaults_off() {
        let req: SimulateRequest =
            serde_json::from_str(r#"{"direction": "sol_to_token"}"#).unwrap();
        assert!(!req.ignore_errors);
        assert!(req.amount.is_none());
    }
}
