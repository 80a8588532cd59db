//! Swap simulation sandbox
//!
//! Replays swaps against an in-process Solana ledger seeded from account
//! snapshots. Handles:
//! - Loading the program image and exported account state
//! - Deriving associated token accounts and encoding swap instructions
//! - Running one swap per market on a fresh LiteSVM ledger
//! - Serving simulations from a dedicated thread for the HTTP API

pub mod address;
pub mod config;
pub mod instruction;
pub mod ledger;
pub mod runner;
pub mod state_loader;
pub mod swap_simulator;

use config::{Settings, SimulatorConfig, SwapDirection};
use state_loader::SimulationAssets;
use swap_simulator::{SimulationOptions, SwapRequest, SwapResult, SwapSimulator};

/// Simulate one swap per mainnet market using assets named by the environment.
///
/// `amount` is in human units of the source token and defaults per
/// direction. `slot` is accepted but state always comes from the snapshot.
pub fn simulate(
    direction: SwapDirection,
    amount: Option<f64>,
    slot: Option<u64>,
    ignore_errors: bool,
    print_results: bool,
) -> anyhow::Result<Vec<SwapResult>> {
    let settings = Settings::from_env()?;
    let config = SimulatorConfig::mainnet().with_settings(&settings);
    let simulator = SwapSimulator::new(config, SimulationAssets::load(&settings));

    let request = SwapRequest {
        direction,
        amount,
        slot,
    };
    let options = SimulationOptions {
        ignore_errors,
        print_results,
        run_id: None,
    };

    Ok(simulator.simulate(&request, options)?)
}
