//! State Loader - Hydrates the ledger from exported account snapshots
//!
//! Snapshots use the JSON-RPC account shape, one record per account:
//!
//! ```json
//! {"address": "<base58>", "account": {"lamports": 1, "data": ["<base64>", "base64"],
//!  "owner": "<base58>", "executable": false, "rentEpoch": 0}}
//! ```
//!
//! Files may be a JSON array, a single JSON record, or JSONL. A directory is
//! read file by file. Malformed records are skipped with a warning.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::config::Settings;
use crate::types::SnapshotError;

/// A single account record as exported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedAccount {
    #[serde(alias = "pubkey")]
    pub address: String,
    pub account: ExportedAccountState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedAccountState {
    #[serde(alias = "balance")]
    pub lamports: u64,
    #[serde(default)]
    pub data: AccountData,
    pub owner: String,
    #[serde(default)]
    pub executable: bool,
    #[serde(default, alias = "rent_epoch")]
    pub rent_epoch: u64,
}

/// Account data as either a bare base64 string or `[payload, encoding]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountData {
    Base64(String),
    Encoded(Vec<String>),
}

impl Default for AccountData {
    fn default() -> Self {
        AccountData::Base64(String::new())
    }
}

impl AccountData {
    pub fn decode(&self) -> Result<Vec<u8>, String> {
        let (payload, encoding) = match self {
            AccountData::Base64(payload) => (payload.as_str(), "base64"),
            AccountData::Encoded(parts) => match parts.as_slice() {
                [payload] => (payload.as_str(), "base64"),
                [payload, encoding] => (payload.as_str(), encoding.as_str()),
                _ => return Err(format!("expected [data, encoding], got {} parts", parts.len())),
            },
        };

        if encoding != "base64" {
            return Err(format!("unsupported data encoding: {}", encoding));
        }
        STANDARD
            .decode(payload)
            .map_err(|e| format!("invalid base64 data: {}", e))
    }
}

impl ExportedAccount {
    /// Validate addresses and decode data into a ledger account
    pub fn into_account(self) -> Result<(Pubkey, Account), String> {
        let address = Pubkey::from_str(&self.address)
            .map_err(|_| format!("invalid address {}", self.address))?;
        let owner = Pubkey::from_str(&self.account.owner)
            .map_err(|_| format!("invalid owner {} for {}", self.account.owner, self.address))?;
        let data = self.account.data.decode()?;

        Ok((
            address,
            Account {
                lamports: self.account.lamports,
                data,
                owner,
                executable: self.account.executable,
                rent_epoch: self.account.rent_epoch,
            },
        ))
    }
}

/// Accounts collected from one or more snapshot files, keyed by address
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    accounts: BTreeMap<Pubkey, Account>,
    skipped: usize,
}

impl AccountSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file or every `.json` / `.jsonl` file inside a directory
    pub fn load_from_path(&mut self, path: &Path) -> Result<usize, SnapshotError> {
        if path.is_dir() {
            self.load_from_dir(path)
        } else {
            self.load_from_file(path)
        }
    }

    /// Load a directory of snapshot files. Unreadable files are skipped.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<usize, SnapshotError> {
        let entries = std::fs::read_dir(dir).map_err(|source| SnapshotError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("jsonl"))
            })
            .collect();
        files.sort();

        let mut count = 0;
        for file in files {
            match self.load_from_file(&file) {
                Ok(n) => count += n,
                Err(e) => {
                    tracing::warn!("Skipping snapshot file: {}", e);
                    self.skipped += 1;
                }
            }
        }
        Ok(count)
    }

    /// Load state from a JSON/JSONL file
    /// Auto-detects format based on file extension
    pub fn load_from_file(&mut self, path: &Path) -> Result<usize, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_jsonl = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

        if is_jsonl {
            Ok(self.load_from_jsonl(&content))
        } else {
            self.load_from_json(&content)
                .map_err(|source| SnapshotError::Parse {
                    path: path.display().to_string(),
                    source,
                })
        }
    }

    /// Load a JSON array of records, or a single record
    pub fn load_from_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let records = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        let mut count = 0;
        for record in records {
            if self.insert_value(record) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Load JSONL (one record per line)
    ///
    /// Later records for the same address replace earlier ones.
    pub fn load_from_jsonl(&mut self, jsonl: &str) -> usize {
        let mut count = 0;
        for (line_no, line) in jsonl.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(value) => {
                    if self.insert_value(value) {
                        count += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed snapshot line {}: {}", line_no + 1, e);
                    self.skipped += 1;
                }
            }
        }
        count
    }

    fn insert_value(&mut self, value: serde_json::Value) -> bool {
        let record = match serde_json::from_value::<ExportedAccount>(value) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping malformed snapshot record: {}", e);
                self.skipped += 1;
                return false;
            }
        };

        match record.into_account() {
            Ok((address, account)) => {
                self.accounts.insert(address, account);
                true
            }
            Err(reason) => {
                tracing::warn!("Skipping snapshot record: {}", reason);
                self.skipped += 1;
                false
            }
        }
    }

    pub fn insert(&mut self, address: Pubkey, account: Account) {
        self.accounts.insert(address, account);
    }

    pub fn get(&self, address: &Pubkey) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Records or files dropped while loading
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pubkey, &Account)> {
        self.accounts.iter()
    }
}

/// Program image plus account state used to seed every simulation
#[derive(Debug, Clone, Default)]
pub struct SimulationAssets {
    pub program_image: Option<Vec<u8>>,
    pub snapshot: AccountSnapshot,
}

impl SimulationAssets {
    pub fn new(program_image: Option<Vec<u8>>, snapshot: AccountSnapshot) -> Self {
        Self {
            program_image,
            snapshot,
        }
    }

    /// Read the program image and snapshots named by `settings`.
    ///
    /// Missing inputs are logged, not fatal: without an image every swap
    /// fails at submission, without snapshots markets are simply absent.
    pub fn load(settings: &Settings) -> Self {
        let program_image = match std::fs::read(&settings.program_path) {
            Ok(bytes) => {
                tracing::info!(
                    "Loaded program image: {} bytes from {}",
                    bytes.len(),
                    settings.program_path.display()
                );
                Some(bytes)
            }
            Err(e) => {
                tracing::warn!(
                    "Program image not available at {}: {}",
                    settings.program_path.display(),
                    e
                );
                None
            }
        };

        let mut snapshot = AccountSnapshot::new();
        if settings.accounts_path.exists() {
            match snapshot.load_from_path(&settings.accounts_path) {
                Ok(count) => tracing::info!(
                    "Loaded {} snapshot accounts from {} ({} skipped)",
                    count,
                    settings.accounts_path.display(),
                    snapshot.skipped()
                ),
                Err(e) => tracing::warn!("Failed to load snapshot accounts: {}", e),
            }
        } else {
            tracing::warn!(
                "Snapshot path not found: {}",
                settings.accounts_path.display()
            );
        }

        Self {
            program_image,
            snapshot,
        }
    }
}
