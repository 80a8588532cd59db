//! Swap Simulator
//!
//! Runs one swap per configured market against a freshly seeded ledger and
//! reports the output measured on the user's destination token account.
//!
//! A call moves through three phases:
//! 1. setup: validate the amount, boot the ledger, install the program,
//!    seed snapshot accounts, create and fund a synthetic user
//! 2. per-market loop: strictly sequential, each swap sees the state left
//!    by the previous one
//! 3. done: results in market order
//!
//! Only setup failures abort the call. A failing market is recorded (or
//! dropped when `ignore_errors` is set) and the loop moves on.

use serde::{Deserialize, Serialize};
use std::io::Write;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use uuid::Uuid;

use super::address;
use super::config::{Market, SimulatorConfig, SwapDirection, TokenSpec};
use super::instruction::{self, SwapAccounts};
use super::ledger::{mint_account, token_account, token_balance, wallet_account, Ledger, SvmLedger};
use super::state_loader::SimulationAssets;
use crate::types::SimulationError;

/// What to simulate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub direction: SwapDirection,
    /// Human units of the source token; defaults per direction
    #[serde(default)]
    pub amount: Option<f64>,
    /// Accepted for API compatibility; state always comes from the snapshot
    #[serde(default)]
    pub slot: Option<u64>,
}

impl SwapRequest {
    pub fn new(direction: SwapDirection) -> Self {
        Self {
            direction,
            amount: None,
            slot: None,
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_slot(mut self, slot: u64) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn human_amount(&self) -> f64 {
        self.amount.unwrap_or_else(|| self.direction.default_amount())
    }
}

/// Reporting policy for a simulation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationOptions {
    /// Drop failed markets from the results instead of reporting them
    pub ignore_errors: bool,
    /// Print one CSV line per reported market to stdout
    pub print_results: bool,
    /// Correlation id for the run's log span; generated when absent
    pub run_id: Option<Uuid>,
}

/// Outcome of one swap on one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapResult {
    pub market: String,
    pub input_amount: f64,
    pub output_amount: Option<f64>,
    pub error: Option<String>,
}

impl SwapResult {
    pub fn succeeded(market: &Market, input_amount: f64, output_amount: f64) -> Self {
        Self {
            market: market.to_string(),
            input_amount,
            output_amount: Some(output_amount),
            error: None,
        }
    }

    pub fn failed(market: &Market, input_amount: f64, error: impl Into<String>) -> Self {
        Self {
            market: market.to_string(),
            input_amount,
            output_amount: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.output_amount.is_some()
    }

    /// Output per unit of input, in human units
    pub fn effective_price(&self) -> Option<f64> {
        match self.output_amount {
            Some(out) if self.input_amount > 0.0 => Some(out / self.input_amount),
            _ => None,
        }
    }

    /// `market,input,output,` on success, `market,input,,error` on failure
    pub fn csv_line(&self) -> String {
        match (&self.output_amount, &self.error) {
            (Some(out), _) => format!("{},{},{},", self.market, self.input_amount, out),
            (None, Some(err)) => format!("{},{},,{}", self.market, self.input_amount, err),
            (None, None) => format!("{},{},,", self.market, self.input_amount),
        }
    }
}

/// Validated, direction-resolved parameters of one call
struct RunPlan<'a> {
    direction: SwapDirection,
    source: &'a TokenSpec,
    destination: &'a TokenSpec,
    input_amount: f64,
    amount_in: u64,
    /// Source tokens the user needs to cover every market
    total_input: u64,
    user_lamports: u64,
}

pub struct SwapSimulator {
    config: SimulatorConfig,
    assets: SimulationAssets,
}

impl SwapSimulator {
    pub fn new(config: SimulatorConfig, assets: SimulationAssets) -> Self {
        Self { config, assets }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn assets(&self) -> &SimulationAssets {
        &self.assets
    }

    /// Simulate on a fresh LiteSVM ledger
    pub fn simulate(
        &self,
        request: &SwapRequest,
        options: SimulationOptions,
    ) -> Result<Vec<SwapResult>, SimulationError> {
        self.simulate_with::<SvmLedger>(request, options)
    }

    /// Simulate on a fresh ledger of type `L`
    pub fn simulate_with<L: Ledger>(
        &self,
        request: &SwapRequest,
        options: SimulationOptions,
    ) -> Result<Vec<SwapResult>, SimulationError> {
        let plan = self.plan(request)?;
        let ledger = L::initialize().map_err(SimulationError::LedgerInit)?;
        self.run(ledger, &plan, options, &mut std::io::stdout())
    }

    /// Simulate on a caller-supplied empty ledger, consuming it
    pub fn simulate_on<L: Ledger>(
        &self,
        ledger: L,
        request: &SwapRequest,
        options: SimulationOptions,
    ) -> Result<Vec<SwapResult>, SimulationError> {
        self.simulate_on_writer(ledger, request, options, &mut std::io::stdout())
    }

    /// Like `simulate_on`, with print-mode lines written to `out`
    pub fn simulate_on_writer<L: Ledger, W: Write>(
        &self,
        ledger: L,
        request: &SwapRequest,
        options: SimulationOptions,
        out: &mut W,
    ) -> Result<Vec<SwapResult>, SimulationError> {
        let plan = self.plan(request)?;
        self.run(ledger, &plan, options, out)
    }

    fn plan(&self, request: &SwapRequest) -> Result<RunPlan<'_>, SimulationError> {
        let direction = request.direction;
        let source = direction.source(&self.config.pair);
        let destination = direction.destination(&self.config.pair);
        let input_amount = request.human_amount();
        let amount_in = source.to_atomic(input_amount)?;

        let markets = self.config.markets.len() as u64;
        let total_input = amount_in.checked_mul(markets).ok_or_else(|| {
            SimulationError::InvalidAmount(format!(
                "{} {} across {} markets overflows u64",
                input_amount, source.symbol, markets
            ))
        })?;

        let wrapped = if direction.spends_native() { total_input } else { 0 };
        let user_lamports = wrapped
            .checked_add(self.config.fee_reserve_lamports)
            .ok_or_else(|| {
                SimulationError::InvalidAmount(format!(
                    "{} {} plus fee reserve overflows u64",
                    input_amount, source.symbol
                ))
            })?;

        if let Some(slot) = request.slot {
            tracing::debug!("Slot hint {} ignored, using snapshot state", slot);
        }

        Ok(RunPlan {
            direction,
            source,
            destination,
            input_amount,
            amount_in,
            total_input,
            user_lamports,
        })
    }

    fn run<L: Ledger, W: Write>(
        &self,
        mut ledger: L,
        plan: &RunPlan<'_>,
        options: SimulationOptions,
        out: &mut W,
    ) -> Result<Vec<SwapResult>, SimulationError> {
        let run_id = options.run_id.unwrap_or_else(Uuid::new_v4);
        let span = tracing::info_span!("simulation", %run_id, direction = %plan.direction);
        let _enter = span.enter();

        let user = self.setup(&mut ledger, plan)?;

        tracing::info!(
            "Simulating {} {} -> {} on {} markets",
            plan.input_amount,
            plan.source.symbol,
            plan.destination.symbol,
            self.config.markets.len()
        );

        let mut results = Vec::with_capacity(self.config.markets.len());
        for market in &self.config.markets {
            let result = match self.execute_market(&mut ledger, &user, plan, market) {
                Ok(out_atomic) => {
                    let output = plan.destination.to_human(out_atomic);
                    tracing::info!("  {} -> {} {}", market, output, plan.destination.symbol);
                    SwapResult::succeeded(market, plan.input_amount, output)
                }
                Err(error) => {
                    tracing::warn!("  {} failed: {}", market, error);
                    if options.ignore_errors {
                        continue;
                    }
                    SwapResult::failed(market, plan.input_amount, error)
                }
            };

            if options.print_results {
                if let Err(e) = writeln!(out, "{}", result.csv_line()) {
                    tracing::warn!("Failed to print result for {}: {}", market, e);
                }
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Install the program, seed state, and return a funded synthetic user
    fn setup<L: Ledger>(&self, ledger: &mut L, plan: &RunPlan<'_>) -> Result<Keypair, SimulationError> {
        match &self.assets.program_image {
            Some(image) => {
                ledger
                    .load_program(self.config.program_id, image)
                    .map_err(SimulationError::ProgramLoad)?;
                tracing::debug!("Installed program {} ({} bytes)", self.config.program_id, image.len());
            }
            None => tracing::warn!(
                "No program image for {}; swaps will fail at submission",
                self.config.program_id
            ),
        }

        let mut seeded = 0;
        for (address, account) in self.assets.snapshot.iter() {
            match ledger.seed_account(*address, account.clone()) {
                Ok(()) => seeded += 1,
                Err(e) => tracing::warn!("Skipping snapshot account: {}", e),
            }
        }
        tracing::debug!("Seeded {} snapshot accounts", seeded);

        // Wrapping needs the native mint; fresh ledgers do not carry it
        let native = &self.config.pair.native;
        if ledger.read_account(&native.mint).is_none() {
            let mint = mint_account(native.decimals, &self.config.token_program);
            match ledger.seed_account(native.mint, mint) {
                Ok(()) => tracing::debug!("Seeded native mint {}", native.mint),
                Err(e) => tracing::warn!("Native mint unavailable: {}", e),
            }
        }

        let user = Keypair::new();
        ledger
            .seed_account(user.pubkey(), wallet_account(plan.user_lamports))
            .map_err(SimulationError::Funding)?;

        if !plan.direction.spends_native() {
            let source_account = address::derive_with_program(
                &plan.source.mint,
                &user.pubkey(),
                &self.config.token_program,
            );
            ledger
                .seed_account(
                    source_account,
                    token_account(
                        &plan.source.mint,
                        &user.pubkey(),
                        plan.total_input,
                        &self.config.token_program,
                    ),
                )
                .map_err(SimulationError::Funding)?;
        }

        tracing::debug!("Synthetic user {} funded", user.pubkey());
        Ok(user)
    }

    /// Submit one swap and return the atomic amount received
    fn execute_market<L: Ledger>(
        &self,
        ledger: &mut L,
        user: &Keypair,
        plan: &RunPlan<'_>,
        market: &Market,
    ) -> Result<u64, String> {
        let owner = user.pubkey();
        let destination =
            address::derive_with_program(&plan.destination.mint, &owner, &self.config.token_program);

        let before = token_balance(ledger.read_account(&destination).as_ref());

        let instructions = self.build_instructions(&owner, market, plan)?;
        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&owner),
            &[user],
            ledger.latest_blockhash(),
        );

        match ledger.submit(transaction) {
            Ok(receipt) => {
                tracing::debug!(
                    "{} confirmed: {} compute units",
                    market,
                    receipt.compute_units
                );
            }
            Err(failure) => {
                for line in &failure.logs {
                    tracing::debug!("    {}", line);
                }
                return Err(failure.message);
            }
        }

        let after = token_balance(ledger.read_account(&destination).as_ref());
        after.checked_sub(before).ok_or_else(|| {
            format!(
                "destination balance decreased from {} to {}",
                before, after
            )
        })
    }

    /// ATA setup, optional SOL wrapping, then the swap itself
    fn build_instructions(
        &self,
        owner: &Pubkey,
        market: &Market,
        plan: &RunPlan<'_>,
    ) -> Result<Vec<Instruction>, String> {
        let config = &self.config;
        let native = &config.pair.native.mint;
        let paired = &config.pair.paired.mint;

        let mut instructions = vec![
            create_associated_token_account_idempotent(owner, owner, native, &config.token_program),
            create_associated_token_account_idempotent(owner, owner, paired, &config.token_program),
        ];

        if plan.direction.spends_native() {
            let wrapped = address::derive_with_program(native, owner, &config.token_program);
            #[allow(deprecated)]
            instructions.push(solana_sdk::system_instruction::transfer(
                owner,
                &wrapped,
                plan.amount_in,
            ));
            instructions.push(
                spl_token::instruction::sync_native(&config.token_program, &wrapped)
                    .map_err(|e| format!("failed to build sync_native: {}", e))?,
            );
        }

        let swap = instruction::swap_instruction(
            SwapAccounts {
                program_id: &config.program_id,
                market: market.address(),
                user: owner,
                token_a: native,
                token_b: paired,
                token_program: &config.token_program,
            },
            plan.direction,
            plan.amount_in,
        );
        tracing::debug!("Swap payload for {}: {}", market, hex::encode(&swap.data));
        instructions.push(swap);

        Ok(instructions)
    }
}
