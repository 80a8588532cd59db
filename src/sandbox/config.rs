//! Simulator configuration
//!
//! `SimulatorConfig` is the immutable description of what gets simulated:
//! the swap program, the token pair and the ordered market list. `Settings`
//! carries the deployment knobs read from the environment.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::{ConfigError, SimulationError};

/// SolFi swap program
pub const SWAP_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("SoLFiHG9TfgtdUXUjWAxi3LtvYuFyDLVhBWxdMZxyCe");

/// USDC mint
pub const USDC_MINT: Pubkey = solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

const MAINNET_MARKETS: [Pubkey; 4] = [
    solana_sdk::pubkey!("AHhiY6GAKfBkvseQDQbBC7qp3fTRNpyZccuEdYSdPFEf"),
    solana_sdk::pubkey!("CAPhoEse9xEH95XmdnJjYrZdNCA8xfUWdy3aWymHa1Vj"),
    solana_sdk::pubkey!("5guD4Uz462GT4Y4gEuqyGsHZ59JGxFN4a3rF6KWguMcJ"),
    solana_sdk::pubkey!("DH4xmaWDnTzKXehVaPSNy9tMKJxnYL5Mo5U3oTHFtNYJ"),
];

const DEFAULT_FEE_RESERVE_LAMPORTS: u64 = 1_000_000_000; // 1 SOL
const DEFAULT_PROGRAM_PATH: &str = "./data/program.so";
const DEFAULT_ACCOUNTS_PATH: &str = "./data/accounts";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// Swap direction over the configured native/paired token pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    SolToToken,
    TokenToSol,
}

impl SwapDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapDirection::SolToToken => "sol_to_token",
            SwapDirection::TokenToSol => "token_to_sol",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sol_to_token" | "sol-to-token" | "soltotoken" | "buy" => Some(SwapDirection::SolToToken),
            "token_to_sol" | "token-to-sol" | "tokentosol" | "sell" => {
                Some(SwapDirection::TokenToSol)
            }
            _ => None,
        }
    }

    pub fn all() -> &'static [SwapDirection] {
        &[SwapDirection::SolToToken, SwapDirection::TokenToSol]
    }

    /// Byte stored at the last offset of the swap payload
    pub fn flag(&self) -> u8 {
        match self {
            SwapDirection::SolToToken => 0,
            SwapDirection::TokenToSol => 1,
        }
    }

    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(SwapDirection::SolToToken),
            1 => Some(SwapDirection::TokenToSol),
            _ => None,
        }
    }

    /// Human amount used when the caller does not supply one
    pub fn default_amount(&self) -> f64 {
        match self {
            SwapDirection::SolToToken => 10.0,
            SwapDirection::TokenToSol => 1000.0,
        }
    }

    /// Whether the input leg spends the native asset (and needs wrapping)
    pub fn spends_native(&self) -> bool {
        matches!(self, SwapDirection::SolToToken)
    }

    pub fn source<'a>(&self, pair: &'a TokenPair) -> &'a TokenSpec {
        match self {
            SwapDirection::SolToToken => &pair.native,
            SwapDirection::TokenToSol => &pair.paired,
        }
    }

    pub fn destination<'a>(&self, pair: &'a TokenPair) -> &'a TokenSpec {
        match self {
            SwapDirection::SolToToken => &pair.paired,
            SwapDirection::TokenToSol => &pair.native,
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of the traded pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSpec {
    pub symbol: String,
    #[serde(serialize_with = "serialize_pubkey")]
    pub mint: Pubkey,
    pub decimals: u8,
}

impl TokenSpec {
    pub fn new(symbol: &str, mint: Pubkey, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            mint,
            decimals,
        }
    }

    /// `floor(human * 10^decimals)`, rejecting values outside `u64`
    pub fn to_atomic(&self, human: f64) -> Result<u64, SimulationError> {
        if !human.is_finite() || human < 0.0 {
            return Err(SimulationError::InvalidAmount(format!(
                "{} {} is not a non-negative finite amount",
                human, self.symbol
            )));
        }

        let scaled = (human * 10f64.powi(self.decimals as i32)).floor();
        // 2^64: first value that no longer fits
        if scaled >= 18_446_744_073_709_551_616.0 {
            return Err(SimulationError::InvalidAmount(format!(
                "{} {} exceeds the u64 atomic range",
                human, self.symbol
            )));
        }

        Ok(scaled as u64)
    }

    pub fn to_human(&self, atomic: u64) -> f64 {
        atomic as f64 / 10f64.powi(self.decimals as i32)
    }
}

/// Native asset (wrapped SOL) and the paired token it trades against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub native: TokenSpec,
    pub paired: TokenSpec,
}

impl TokenPair {
    pub fn sol_usdc() -> Self {
        Self {
            native: TokenSpec::new("SOL", spl_token::native_mint::id(), 9),
            paired: TokenSpec::new("USDC", USDC_MINT, 6),
        }
    }
}

/// An on-chain market account of the swap program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Market(pub Pubkey);

impl Market {
    pub fn address(&self) -> &Pubkey {
        &self.0
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Market {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pubkey::from_str(s.trim())
            .map(Market)
            .map_err(|_| ConfigError::InvalidAddress {
                name: "market".to_string(),
                value: s.to_string(),
            })
    }
}

impl Serialize for Market {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

/// Immutable description of the simulated program and its markets
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    #[serde(serialize_with = "serialize_pubkey")]
    pub program_id: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub token_program: Pubkey,
    pub pair: TokenPair,
    /// Simulated in this order; results come back in this order
    pub markets: Vec<Market>,
    /// Lamports given to the synthetic user on top of swap inputs
    pub fee_reserve_lamports: u64,
}

impl SimulatorConfig {
    /// SolFi SOL/USDC markets on mainnet
    pub fn mainnet() -> Self {
        Self {
            program_id: SWAP_PROGRAM_ID,
            token_program: spl_token::id(),
            pair: TokenPair::sol_usdc(),
            markets: MAINNET_MARKETS.iter().copied().map(Market).collect(),
            fee_reserve_lamports: DEFAULT_FEE_RESERVE_LAMPORTS,
        }
    }

    /// Apply the environment overrides from `settings`
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if let Some(markets) = &settings.markets {
            self.markets = markets.clone();
        }
        if let Some(reserve) = settings.fee_reserve_lamports {
            self.fee_reserve_lamports = reserve;
        }
        self
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Deployment settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub program_path: PathBuf,
    pub accounts_path: PathBuf,
    pub bind_addr: String,
    pub markets: Option<Vec<Market>>,
    pub fee_reserve_lamports: Option<u64>,
}

impl Settings {
    /// Read settings from process environment (after loading `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let program_path = lookup("SWAP_PROGRAM_PATH").unwrap_or_else(|| DEFAULT_PROGRAM_PATH.into());
        let accounts_path = lookup("ACCOUNTS_PATH").unwrap_or_else(|| DEFAULT_ACCOUNTS_PATH.into());
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());

        let markets = match lookup("SWAP_MARKETS") {
            Some(raw) => {
                let markets = raw
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| {
                        Market::from_str(s).map_err(|_| ConfigError::InvalidAddress {
                            name: "SWAP_MARKETS".to_string(),
                            value: s.trim().to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if markets.is_empty() {
                    return Err(ConfigError::Empty {
                        name: "SWAP_MARKETS".to_string(),
                    });
                }
                Some(markets)
            }
            None => None,
        };

        let fee_reserve_lamports = match lookup("FEE_RESERVE_LAMPORTS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    name: "FEE_RESERVE_LAMPORTS".to_string(),
                    value: raw.clone(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            program_path: PathBuf::from(program_path),
            accounts_path: PathBuf::from(accounts_path),
            bind_addr,
            markets,
            fee_reserve_lamports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_atomic_conversion_native() {
        let pair = TokenPair::sol_usdc();
        assert_eq!(pair.native.to_atomic(10.0).unwrap(), 10_000_000_000);
    }

    #[test]
    fn test_atomic_conversion_paired() {
        let pair = TokenPair::sol_usdc();
        assert_eq!(pair.paired.to_atomic(1000.0).unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_atomic_conversion_floors() {
        let pair = TokenPair::sol_usdc();
        assert_eq!(pair.paired.to_atomic(0.0000019).unwrap(), 1);
        assert_eq!(pair.paired.to_atomic(0.0).unwrap(), 0);
    }

    #[test]
    fn test_atomic_conversion_rejects_bad_input() {
        let pair = TokenPair::sol_usdc();
        assert!(pair.native.to_atomic(-1.0).is_err());
        assert!(pair.native.to_atomic(f64::NAN).is_err());
        assert!(pair.native.to_atomic(f64::INFINITY).is_err());
        // 2e10 SOL is 2e19 lamports, past u64::MAX
        assert!(pair.native.to_atomic(20_000_000_000.0).is_err());
    }

    #[test]
    fn test_direction_roles() {
        let pair = TokenPair::sol_usdc();
        assert_eq!(SwapDirection::SolToToken.source(&pair).decimals, 9);
        assert_eq!(SwapDirection::SolToToken.destination(&pair).decimals, 6);
        assert_eq!(SwapDirection::TokenToSol.source(&pair).symbol, "USDC");
        assert_eq!(SwapDirection::TokenToSol.destination(&pair).symbol, "SOL");
    }

    #[test]
    fn test_default_amounts() {
        assert_eq!(SwapDirection::SolToToken.default_amount(), 10.0);
        assert_eq!(SwapDirection::TokenToSol.default_amount(), 1000.0);
    }

    #[test]
    fn test_direction_flags() {
        for direction in SwapDirection::all() {
            assert_eq!(SwapDirection::from_flag(direction.flag()), Some(*direction));
        }
        assert_eq!(SwapDirection::from_flag(2), None);
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!(
            SwapDirection::from_str("SOL-TO-TOKEN"),
            Some(SwapDirection::SolToToken)
        );
        assert_eq!(SwapDirection::from_str("sell"), Some(SwapDirection::TokenToSol));
        assert_eq!(SwapDirection::from_str("sideways"), None);
    }

    #[test]
    fn test_mainnet_config() {
        let config = SimulatorConfig::mainnet();
        assert_eq!(config.markets.len(), 4);
        assert_eq!(config.program_id, SWAP_PROGRAM_ID);
        assert_eq!(config.pair.native.mint, spl_token::native_mint::id());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.program_path, PathBuf::from(DEFAULT_PROGRAM_PATH));
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert!(settings.markets.is_none());
    }

    #[test]
    fn test_settings_override_markets() {
        let settings = Settings::from_lookup(lookup_from(&[
            (
                "SWAP_MARKETS",
                "AHhiY6GAKfBkvseQDQbBC7qp3fTRNpyZccuEdYSdPFEf, DH4xmaWDnTzKXehVaPSNy9tMKJxnYL5Mo5U3oTHFtNYJ",
            ),
            ("FEE_RESERVE_LAMPORTS", "5000"),
        ]))
        .unwrap();

        let config = SimulatorConfig::mainnet().with_settings(&settings);
        assert_eq!(config.markets.len(), 2);
        assert_eq!(config.markets[1].0, MAINNET_MARKETS[3]);
        assert_eq!(config.fee_reserve_lamports, 5000);
    }

    #[test]
    fn test_settings_reject_malformed_market() {
        let result = Settings::from_lookup(lookup_from(&[("SWAP_MARKETS", "not-a-key")]));
        assert!(matches!(result, Err(ConfigError::InvalidAddress { .. })));
    }

    #[test]
    fn test_settings_reject_bad_reserve() {
        let result = Settings::from_lookup(lookup_from(&[("FEE_RESERVE_LAMPORTS", "lots")]));
        assert!(matches!(result, Err(ConfigError::InvalidNumber { .. })));
    }
}
