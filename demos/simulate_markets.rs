//! Simulate SolFi swaps on every configured market
//!
//! This demo:
//! 1. Reads SWAP_PROGRAM_PATH / ACCOUNTS_PATH from the environment (or .env)
//! 2. Swaps 10 SOL -> USDC on each market, printing CSV lines
//! 3. Swaps 1000 USDC -> SOL on each market, printing CSV lines
//! 4. Ranks the markets that succeeded by effective price
//!
//! Run with: cargo run --example simulate_markets

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amm_swap_sandbox::sandbox;
use amm_swap_sandbox::sandbox::config::SwapDirection;
use amm_swap_sandbox::sandbox::swap_simulator::SwapResult;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    for direction in SwapDirection::all() {
        println!("=== {} ({}) ===", direction, direction.default_amount());
        println!("market,input,output,error");

        let results = sandbox::simulate(*direction, None, None, false, true)?;
        print_ranking(&results);
        println!();
    }

    Ok(())
}

fn print_ranking(results: &[SwapResult]) {
    let mut priced: Vec<(&str, f64)> = results
        .iter()
        .filter_map(|r| r.effective_price().map(|p| (r.market.as_str(), p)))
        .collect();

    if priced.is_empty() {
        println!("# no market produced output");
        return;
    }

    priced.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (rank, (market, price)) in priced.iter().enumerate() {
        println!("# {}. {} @ {:.6}", rank + 1, market, price);
    }
}
