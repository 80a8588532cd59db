//! In-memory ledger for exercising the swap simulator without a program image.
//!
//! Understands exactly the instructions the simulator emits: idempotent ATA
//! creation, system transfers, `sync_native`, and the swap payload. The swap
//! itself is a constant-price market: `price` paired units per native unit.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::rent::Rent;
use solana_sdk::transaction::Transaction;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, Mint};

use amm_swap_sandbox::sandbox::address;
use amm_swap_sandbox::sandbox::config::{SwapDirection, SWAP_PROGRAM_ID};
use amm_swap_sandbox::sandbox::instruction;
use amm_swap_sandbox::sandbox::config::USDC_MINT;
use amm_swap_sandbox::sandbox::ledger::{
    mint_account, token_account, wallet_account, ExecutionFailure, ExecutionReceipt, Ledger,
};
use amm_swap_sandbox::sandbox::state_loader::AccountSnapshot;
use amm_swap_sandbox::types::LedgerError;

/// USDC per SOL
pub const DEFAULT_PRICE: u64 = 150;
const SIGNATURE_FEE: u64 = 5_000;
const SYSTEM_TRANSFER: u32 = 2;
const SYNC_NATIVE: u8 = 17;

#[derive(Default)]
pub struct MockState {
    pub accounts: HashMap<Pubkey, Account>,
    pub programs: HashSet<Pubkey>,
    pub failing_markets: HashSet<Pubkey>,
    pub prices: HashMap<Pubkey, u64>,
    pub submitted: usize,
    pub blockhash_seed: u8,
}

/// Cloning shares the underlying state so a test can keep a view after
/// handing the ledger to the simulator.
#[derive(Clone, Default)]
pub struct MockLedger {
    state: Rc<RefCell<MockState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every swap against `market` fails with a program error
    pub fn failing(self, market: Pubkey) -> Self {
        self.state.borrow_mut().failing_markets.insert(market);
        self
    }

    pub fn with_price(self, market: Pubkey, price: u64) -> Self {
        self.state.borrow_mut().prices.insert(market, price);
        self
    }

    pub fn submitted(&self) -> usize {
        self.state.borrow().submitted
    }

    pub fn account_count(&self) -> usize {
        self.state.borrow().accounts.len()
    }

    pub fn has_program(&self, program_id: &Pubkey) -> bool {
        self.state.borrow().programs.contains(program_id)
    }

    pub fn lamports(&self, address: &Pubkey) -> Option<u64> {
        self.state.borrow().accounts.get(address).map(|a| a.lamports)
    }

    /// The synthetic user is the only system-owned account holding lamports
    pub fn wallets(&self) -> Vec<Pubkey> {
        self.state
            .borrow()
            .accounts
            .iter()
            .filter(|(_, a)| a.owner == solana_sdk::system_program::id() && a.data.is_empty())
            .map(|(k, _)| *k)
            .collect()
    }
}

impl Ledger for MockLedger {
    fn initialize() -> Result<Self, LedgerError> {
        Ok(Self::new())
    }

    fn load_program(&mut self, program_id: Pubkey, image: &[u8]) -> Result<(), LedgerError> {
        if image.is_empty() {
            return Err(LedgerError::ProgramRejected {
                program_id: program_id.to_string(),
                reason: "empty program image".to_string(),
            });
        }
        self.state.borrow_mut().programs.insert(program_id);
        Ok(())
    }

    fn seed_account(&mut self, address: Pubkey, account: Account) -> Result<(), LedgerError> {
        self.state.borrow_mut().accounts.insert(address, account);
        Ok(())
    }

    fn latest_blockhash(&self) -> Hash {
        Hash::new_from_array([self.state.borrow().blockhash_seed; 32])
    }

    fn submit(&mut self, transaction: Transaction) -> Result<ExecutionReceipt, ExecutionFailure> {
        let mut state = self.state.borrow_mut();
        let mut accounts = state.accounts.clone();
        let keys = &transaction.message.account_keys;
        let payer = keys[0];

        let fee_payer = accounts
            .get_mut(&payer)
            .ok_or_else(|| ExecutionFailure::new("fee payer account not found"))?;
        fee_payer.lamports = fee_payer
            .lamports
            .checked_sub(SIGNATURE_FEE)
            .ok_or_else(|| ExecutionFailure::new("insufficient funds for fee"))?;

        for (index, ix) in transaction.message.instructions.iter().enumerate() {
            let program_id = keys[ix.program_id_index as usize];
            let metas: Vec<Pubkey> = ix.accounts.iter().map(|i| keys[*i as usize]).collect();

            let result = if program_id == spl_associated_token_account::id() {
                create_ata(&mut accounts, &metas)
            } else if program_id == solana_sdk::system_program::id() {
                transfer(&mut accounts, &metas, &ix.data)
            } else if program_id == spl_token::id() {
                sync_native(&mut accounts, &metas, &ix.data)
            } else if state.programs.contains(&program_id) {
                swap(&state, &mut accounts, &metas, &ix.data)
            } else {
                Err(format!("program {} does not exist", program_id))
            };

            result.map_err(|e| ExecutionFailure {
                message: format!("Error processing Instruction {}: {}", index, e),
                logs: vec![format!("Program {} failed: {}", program_id, e)],
            })?;
        }

        state.accounts = accounts;
        state.submitted += 1;
        state.blockhash_seed = state.blockhash_seed.wrapping_add(1);
        Ok(ExecutionReceipt {
            signature: transaction.signatures[0].to_string(),
            compute_units: 1_000,
            logs: Vec::new(),
        })
    }

    fn read_account(&self, address: &Pubkey) -> Option<Account> {
        self.state.borrow().accounts.get(address).cloned()
    }
}

fn create_ata(accounts: &mut HashMap<Pubkey, Account>, metas: &[Pubkey]) -> Result<(), String> {
    let (ata, wallet, mint, token_program) = (metas[1], metas[2], metas[3], metas[5]);
    if address::derive_with_program(&mint, &wallet, &token_program) != ata {
        return Err("invalid seeds for associated token account".to_string());
    }
    // the ATA program rejects mints the token program does not own
    match accounts.get(&mint) {
        Some(account) if account.owner == token_program && Mint::unpack(&account.data).is_ok() => {}
        _ => return Err("incorrect program id for instruction".to_string()),
    }
    accounts
        .entry(ata)
        .or_insert_with(|| token_account(&mint, &wallet, 0, &token_program));
    Ok(())
}

fn transfer(
    accounts: &mut HashMap<Pubkey, Account>,
    metas: &[Pubkey],
    data: &[u8],
) -> Result<(), String> {
    if data.len() != 12 || u32::from_le_bytes([data[0], data[1], data[2], data[3]]) != SYSTEM_TRANSFER {
        return Err("unsupported system instruction".to_string());
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[4..12]);
    let lamports = u64::from_le_bytes(raw);

    let from = accounts
        .get_mut(&metas[0])
        .ok_or("source account not found")?;
    from.lamports = from
        .lamports
        .checked_sub(lamports)
        .ok_or("insufficient lamports")?;

    accounts
        .entry(metas[1])
        .or_insert_with(|| wallet_account(0))
        .lamports += lamports;
    Ok(())
}

fn sync_native(
    accounts: &mut HashMap<Pubkey, Account>,
    metas: &[Pubkey],
    data: &[u8],
) -> Result<(), String> {
    if data != [SYNC_NATIVE] {
        return Err("unsupported token instruction".to_string());
    }
    let account = accounts.get_mut(&metas[0]).ok_or("token account not found")?;
    let mut state = TokenAccount::unpack(&account.data).map_err(|e| e.to_string())?;
    let rent = match state.is_native {
        COption::Some(rent) => rent,
        COption::None => return Err("not a native account".to_string()),
    };
    state.amount = account.lamports.saturating_sub(rent);
    state.pack_into_slice(&mut account.data);
    Ok(())
}

fn swap(
    state: &MockState,
    accounts: &mut HashMap<Pubkey, Account>,
    metas: &[Pubkey],
    data: &[u8],
) -> Result<(), String> {
    let payload = instruction::decode(data).map_err(|e| e.to_string())?;
    let market = metas[1];
    if state.failing_markets.contains(&market) {
        return Err("custom program error: 0x1".to_string());
    }
    let price = state.prices.get(&market).copied().unwrap_or(DEFAULT_PRICE) as u128;
    let amount = payload.amount_in as u128;

    let (native_ata, paired_ata) = (metas[4], metas[5]);
    match payload.direction {
        SwapDirection::SolToToken => {
            // 9 -> 6 decimals
            let out = (amount * price / 1_000) as u64;
            adjust(accounts, &native_ata, -(payload.amount_in as i128), true)?;
            adjust(accounts, &paired_ata, out as i128, false)
        }
        SwapDirection::TokenToSol => {
            let out = (amount * 1_000 / price) as u64;
            adjust(accounts, &paired_ata, -(payload.amount_in as i128), false)?;
            adjust(accounts, &native_ata, out as i128, true)
        }
    }
}

fn adjust(
    accounts: &mut HashMap<Pubkey, Account>,
    address: &Pubkey,
    delta: i128,
    native: bool,
) -> Result<(), String> {
    let account = accounts.get_mut(address).ok_or("token account not found")?;
    let mut state = TokenAccount::unpack(&account.data).map_err(|e| e.to_string())?;

    let amount = state.amount as i128 + delta;
    if amount < 0 {
        return Err("insufficient funds".to_string());
    }
    state.amount = amount as u64;
    if native {
        account.lamports = (account.lamports as i128 + delta) as u64;
    }
    state.pack_into_slice(&mut account.data);
    Ok(())
}

/// Rent-exempt balance the mock uses for token accounts
pub fn token_rent() -> u64 {
    Rent::default().minimum_balance(TokenAccount::LEN)
}

pub fn swap_program() -> Pubkey {
    SWAP_PROGRAM_ID
}

/// Snapshot holding only the USDC mint, the least a swap run needs
pub fn usdc_snapshot() -> AccountSnapshot {
    let mut snapshot = AccountSnapshot::new();
    snapshot.insert(USDC_MINT, mint_account(6, &spl_token::id()));
    snapshot
}
