//! Simulator thread
//!
//! Dedicated OS thread that owns the `SwapSimulator` and serves simulation
//! requests over an mpsc channel, one at a time. Async callers talk to it
//! through `SimulatorHandle` and await a oneshot reply.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::mpsc;
use tokio::sync::oneshot;

use super::ledger::{Ledger, SvmLedger};
use super::swap_simulator::{SimulationOptions, SwapRequest, SwapResult, SwapSimulator};
use crate::types::SimulationError;

/// What the thread was started with
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorStatus {
    pub program_loaded: bool,
    pub program_bytes: usize,
    pub snapshot_accounts: usize,
    pub skipped_records: usize,
    pub requests_served: u64,
}

enum SimulatorRequest {
    Simulate {
        request: SwapRequest,
        options: SimulationOptions,
        response_tx: oneshot::Sender<Result<Vec<SwapResult>, SimulationError>>,
    },
    Status {
        response_tx: oneshot::Sender<SimulatorStatus>,
    },
}

/// Handle for communicating with the simulator thread (Send+Sync)
#[derive(Clone)]
pub struct SimulatorHandle {
    tx: mpsc::Sender<SimulatorRequest>,
}

impl SimulatorHandle {
    /// Run one simulation on a fresh ledger inside the simulator thread
    pub async fn simulate(
        &self,
        request: SwapRequest,
        options: SimulationOptions,
    ) -> Result<Vec<SwapResult>, SimulationError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(SimulatorRequest::Simulate {
                request,
                options,
                response_tx,
            })
            .map_err(|_| SimulationError::Unavailable("thread has shut down".to_string()))?;

        response_rx.await.map_err(|_| {
            SimulationError::Unavailable("thread dropped response channel".to_string())
        })?
    }

    pub async fn status(&self) -> Result<SimulatorStatus> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(SimulatorRequest::Status { response_tx })
            .map_err(|_| anyhow!("Simulator thread has shut down"))?;

        response_rx
            .await
            .map_err(|_| anyhow!("Simulator thread dropped response channel"))
    }
}

/// Spawn the simulator thread on LiteSVM ledgers
pub fn spawn_simulator_thread(
    simulator: SwapSimulator,
) -> (SimulatorHandle, oneshot::Receiver<Result<()>>) {
    spawn_simulator_thread_with::<SvmLedger>(simulator)
}

/// Spawn the simulator thread on ledgers of type `L`.
///
/// The thread:
/// 1. Boots a throwaway ledger and installs the program image (if any) to
///    catch a rejected image before serving traffic
/// 2. Signals ready
/// 3. Loops processing requests until every handle is dropped
pub fn spawn_simulator_thread_with<L: Ledger + 'static>(
    simulator: SwapSimulator,
) -> (SimulatorHandle, oneshot::Receiver<Result<()>>) {
    let (tx, rx) = mpsc::channel::<SimulatorRequest>();
    let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

    std::thread::spawn(move || {
        simulator_thread_main::<L>(rx, ready_tx, simulator);
    });

    (SimulatorHandle { tx }, ready_rx)
}

fn simulator_thread_main<L: Ledger>(
    rx: mpsc::Receiver<SimulatorRequest>,
    ready_tx: oneshot::Sender<Result<()>>,
    simulator: SwapSimulator,
) {
    if let Err(e) = startup_check::<L>(&simulator) {
        tracing::error!("Simulator thread setup failed: {}", e);
        let _ = ready_tx.send(Err(e));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    tracing::info!("Simulator thread ready, processing requests");

    let mut requests_served = 0u64;
    while let Ok(req) = rx.recv() {
        match req {
            SimulatorRequest::Simulate {
                request,
                options,
                response_tx,
            } => {
                let result = simulator.simulate_with::<L>(&request, options);
                requests_served += 1;
                let _ = response_tx.send(result);
            }
            SimulatorRequest::Status { response_tx } => {
                let _ = response_tx.send(status(&simulator, requests_served));
            }
        }
    }

    tracing::info!("Simulator thread shutting down after {} requests", requests_served);
}

fn startup_check<L: Ledger>(simulator: &SwapSimulator) -> Result<()> {
    let mut ledger = L::initialize().map_err(|e| anyhow!("Ledger failed to initialize: {}", e))?;

    match &simulator.assets().program_image {
        Some(image) => {
            ledger
                .load_program(simulator.config().program_id, image)
                .map_err(|e| anyhow!("Program image rejected: {}", e))?;
            tracing::info!(
                "Program {} accepted ({} bytes)",
                simulator.config().program_id,
                image.len()
            );
        }
        None => tracing::warn!("No program image loaded - every swap will report an error"),
    }

    Ok(())
}

fn status(simulator: &SwapSimulator, requests_served: u64) -> SimulatorStatus {
    let assets = simulator.assets();
    SimulatorStatus {
        program_loaded: assets.program_image.is_some(),
        program_bytes: assets.program_image.as_ref().map(|i| i.len()).unwrap_or(0),
        snapshot_accounts: assets.snapshot.len(),
        skipped_records: assets.snapshot.skipped(),
        requests_served,
    }
}
