//! Simulated ledger
//!
//! `Ledger` is the seam between the swap simulator and the VM that executes
//! transactions. `SvmLedger` runs them in-process on LiteSVM; nothing here
//! ever touches a network.

use litesvm::LiteSVM;
use solana_sdk::account::Account;
use solana_sdk::bpf_loader;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::rent::Rent;
use solana_sdk::transaction::Transaction;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, AccountState, Mint};

use crate::types::LedgerError;

/// Successful transaction outcome
#[derive(Debug, Clone, Default)]
pub struct ExecutionReceipt {
    pub signature: String,
    pub compute_units: u64,
    pub logs: Vec<String>,
}

/// Transaction rejected or failed mid-execution. State is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionFailure {
    pub message: String,
    pub logs: Vec<String>,
}

impl ExecutionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            logs: Vec::new(),
        }
    }
}

/// An isolated account store that executes transactions atomically.
///
/// One simulation call owns its ledger by value; implementations need no
/// internal locking.
pub trait Ledger {
    /// Boot an empty ledger
    fn initialize() -> Result<Self, LedgerError>
    where
        Self: Sized;

    /// Install an executable image under `program_id`
    fn load_program(&mut self, program_id: Pubkey, image: &[u8]) -> Result<(), LedgerError>;

    /// Inject or overwrite an account
    fn seed_account(&mut self, address: Pubkey, account: Account) -> Result<(), LedgerError>;

    fn latest_blockhash(&self) -> Hash;

    /// Execute all instructions in order; either everything applies or nothing does
    fn submit(&mut self, transaction: Transaction) -> Result<ExecutionReceipt, ExecutionFailure>;

    fn read_account(&self, address: &Pubkey) -> Option<Account>;
}

/// LiteSVM-backed ledger
pub struct SvmLedger {
    svm: LiteSVM,
}

impl Ledger for SvmLedger {
    fn initialize() -> Result<Self, LedgerError> {
        Ok(Self {
            svm: LiteSVM::new(),
        })
    }

    fn load_program(&mut self, program_id: Pubkey, image: &[u8]) -> Result<(), LedgerError> {
        if image.is_empty() {
            return Err(LedgerError::ProgramRejected {
                program_id: program_id.to_string(),
                reason: "empty program image".to_string(),
            });
        }

        // Loader v2 accounts hold the ELF directly; LiteSVM compiles executable
        // accounts into its program cache when they are stored.
        let account = Account {
            lamports: self.svm.minimum_balance_for_rent_exemption(image.len()),
            data: image.to_vec(),
            owner: bpf_loader::id(),
            executable: true,
            rent_epoch: 0,
        };

        self.svm
            .set_account(program_id, account)
            .map_err(|e| LedgerError::ProgramRejected {
                program_id: program_id.to_string(),
                reason: format!("{:?}", e),
            })
    }

    fn seed_account(&mut self, address: Pubkey, account: Account) -> Result<(), LedgerError> {
        self.svm
            .set_account(address, account)
            .map_err(|e| LedgerError::AccountRejected {
                address: address.to_string(),
                reason: format!("{:?}", e),
            })
    }

    fn latest_blockhash(&self) -> Hash {
        self.svm.latest_blockhash()
    }

    fn submit(&mut self, transaction: Transaction) -> Result<ExecutionReceipt, ExecutionFailure> {
        match self.svm.send_transaction(transaction) {
            Ok(meta) => {
                self.svm.expire_blockhash();
                Ok(ExecutionReceipt {
                    signature: meta.signature.to_string(),
                    compute_units: meta.compute_units_consumed,
                    logs: meta.logs,
                })
            }
            Err(failed) => Err(ExecutionFailure {
                message: failed.err.to_string(),
                logs: failed.meta.logs,
            }),
        }
    }

    fn read_account(&self, address: &Pubkey) -> Option<Account> {
        self.svm.get_account(address)
    }
}

/// Amount held by an SPL token account; anything unparsable reads as zero
pub fn token_balance(account: Option<&Account>) -> u64 {
    account
        .and_then(|acc| TokenAccount::unpack(&acc.data).ok())
        .map(|token| token.amount)
        .unwrap_or(0)
}

/// Rent-exempt SPL token account holding `amount` of `mint` for `owner`
pub fn token_account(mint: &Pubkey, owner: &Pubkey, amount: u64, token_program: &Pubkey) -> Account {
    let rent = Rent::default().minimum_balance(TokenAccount::LEN);
    let native = mint == &spl_token::native_mint::id();

    let state = TokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: if native { COption::Some(rent) } else { COption::None },
        delegated_amount: 0,
        close_authority: COption::None,
    };

    let mut data = vec![0u8; TokenAccount::LEN];
    state.pack_into_slice(&mut data);

    Account {
        lamports: if native { rent + amount } else { rent },
        data,
        owner: *token_program,
        executable: false,
        rent_epoch: 0,
    }
}

/// Initialized, authority-less mint with zero supply, as the native mint
/// exists on every cluster
pub fn mint_account(decimals: u8, token_program: &Pubkey) -> Account {
    let state = Mint {
        mint_authority: COption::None,
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };

    let mut data = vec![0u8; Mint::LEN];
    state.pack_into_slice(&mut data);

    Account {
        lamports: Rent::default().minimum_balance(Mint::LEN),
        data,
        owner: *token_program,
        executable: false,
        rent_epoch: 0,
    }
}

/// System-owned wallet account holding `lamports`
pub fn wallet_account(lamports: u64) -> Account {
    Account {
        lamports,
        data: Vec::new(),
        owner: solana_sdk::system_program::id(),
        executable: false,
        rent_epoch: 0,
    }
}
