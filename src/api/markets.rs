//! Market listing endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::AppState;
use crate::sandbox::address;
use crate::sandbox::config::TokenPair;
use crate::sandbox::runner::SimulatorStatus;
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct MarketInfo {
    pub index: usize,
    pub address: String,
    /// Market-owned token accounts for the native and paired mints
    pub native_vault: String,
    pub paired_vault: String,
}

#[derive(Debug, Serialize)]
pub struct MarketsResponse {
    pub program_id: String,
    pub pair: TokenPair,
    pub fee_reserve_lamports: u64,
    pub markets: Vec<MarketInfo>,
    pub status: SimulatorStatus,
}

/// GET /api/markets - List the markets every simulation runs against
pub async fn list_markets(State(state): State<AppState>) -> ApiResult<Json<MarketsResponse>> {
    let config = &state.config;
    let status = state
        .simulator
        .status()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let markets = config
        .markets
        .iter()
        .enumerate()
        .map(|(index, market)| MarketInfo {
            index,
            address: market.to_string(),
            native_vault: address::derive_with_program(
                &config.pair.native.mint,
                market.address(),
                &config.token_program,
            )
            .to_string(),
            paired_vault: address::derive_with_program(
                &config.pair.paired.mint,
                market.address(),
                &config.token_program,
            )
            .to_string(),
        })
        .collect();

    Ok(Json(MarketsResponse {
        program_id: config.program_id.to_string(),
        pair: config.pair.clone(),
        fee_reserve_lamports: config.fee_reserve_lamports,
        markets,
        status,
    }))
}
