//! Associated token account derivation
//!
//! Reproduces the associated-token-account program's address rule:
//! `find_program_address([owner, token_program, mint], ata_program)`.
//! The ledger and the swap program validate against the same derivation, so
//! any divergence here turns every swap into an "account not found" failure.

use solana_sdk::pubkey::Pubkey;

/// Associated token account for `(mint, owner)` under the SPL token program.
pub fn derive(mint: &Pubkey, owner: &Pubkey) -> Pubkey {
    derive_with_program(mint, owner, &spl_token::id())
}

/// Associated token account for `(mint, owner)` under an explicit token program.
pub fn derive_with_program(mint: &Pubkey, owner: &Pubkey, token_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &spl_associated_token_account::id(),
    )
    .0
}
