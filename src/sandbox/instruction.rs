//! Swap instruction encoding
//!
//! Wire layout of the program's swap instruction (18 bytes):
//!
//! | offset | size | field                    |
//! |--------|------|--------------------------|
//! | 0      | 1    | discriminator (`7`)      |
//! | 1      | 8    | amount in, little-endian |
//! | 9      | 8    | reserved, zero           |
//! | 17     | 1    | direction flag           |
//!
//! The account list order and its signer/writable flags are part of the same
//! contract and must not be rearranged.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::sysvar;

use super::address;
use super::config::SwapDirection;
use crate::types::InstructionError;

pub const SWAP_DISCRIMINATOR: u8 = 7;
pub const SWAP_DATA_LEN: usize = 18;
pub const SWAP_ACCOUNT_COUNT: usize = 8;

const AMOUNT_OFFSET: usize = 1;
const DIRECTION_OFFSET: usize = SWAP_DATA_LEN - 1;

/// Decoded swap payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapPayload {
    pub direction: SwapDirection,
    pub amount_in: u64,
}

/// Serialize a swap into the program's instruction data
pub fn encode(direction: SwapDirection, amount_in: u64) -> [u8; SWAP_DATA_LEN] {
    let mut data = [0u8; SWAP_DATA_LEN];
    data[0] = SWAP_DISCRIMINATOR;
    data[AMOUNT_OFFSET..AMOUNT_OFFSET + 8].copy_from_slice(&amount_in.to_le_bytes());
    data[DIRECTION_OFFSET] = direction.flag();
    data
}

pub fn decode(data: &[u8]) -> Result<SwapPayload, InstructionError> {
    if data.len() != SWAP_DATA_LEN {
        return Err(InstructionError::InvalidLength {
            expected: SWAP_DATA_LEN,
            actual: data.len(),
        });
    }
    if data[0] != SWAP_DISCRIMINATOR {
        return Err(InstructionError::UnknownDiscriminator(data[0]));
    }

    let mut amount = [0u8; 8];
    amount.copy_from_slice(&data[AMOUNT_OFFSET..AMOUNT_OFFSET + 8]);
    let direction = SwapDirection::from_flag(data[DIRECTION_OFFSET])
        .ok_or(InstructionError::UnknownDirection(data[DIRECTION_OFFSET]))?;

    Ok(SwapPayload {
        direction,
        amount_in: u64::from_le_bytes(amount),
    })
}

/// Ordered account list for a swap against `market`.
///
/// `token_a` / `token_b` are the pair's mints in the market's own order
/// (native first); the direction only lives in the data payload.
pub fn accounts(
    market: &Pubkey,
    user: &Pubkey,
    token_a: &Pubkey,
    token_b: &Pubkey,
    token_program: &Pubkey,
) -> [AccountMeta; SWAP_ACCOUNT_COUNT] {
    [
        AccountMeta::new(*user, true),
        AccountMeta::new(*market, false),
        AccountMeta::new(address::derive_with_program(token_a, market, token_program), false),
        AccountMeta::new(address::derive_with_program(token_b, market, token_program), false),
        AccountMeta::new(address::derive_with_program(token_a, user, token_program), false),
        AccountMeta::new(address::derive_with_program(token_b, user, token_program), false),
        AccountMeta::new_readonly(*token_program, false),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
    ]
}

/// Everything needed to address one swap on one market
#[derive(Debug, Clone, Copy)]
pub struct SwapAccounts<'a> {
    pub program_id: &'a Pubkey,
    pub market: &'a Pubkey,
    pub user: &'a Pubkey,
    pub token_a: &'a Pubkey,
    pub token_b: &'a Pubkey,
    pub token_program: &'a Pubkey,
}

pub fn swap_instruction(
    keys: SwapAccounts<'_>,
    direction: SwapDirection,
    amount_in: u64,
) -> Instruction {
    Instruction {
        program_id: *keys.program_id,
        accounts: accounts(
            keys.market,
            keys.user,
            keys.token_a,
            keys.token_b,
            keys.token_program,
        )
        .to_vec(),
        data: encode(direction, amount_in).to_vec(),
    }
}
