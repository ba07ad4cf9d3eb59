//! Program-derived identities
//!
//! Every ledger identity is a pure function of the program id and a seed list,
//! so anyone can recompute it and nobody holds a key for it:
//!
//! - amm config:      `[launch_id]`
//! - pool:            `[amm, base_mint]`
//! - pool authority:  `[amm, base_mint, "authority"]`
//! - receipt mint:    `[amm, base_mint, "liquidity"]`

use solana_program::pubkey::Pubkey;

pub const AUTHORITY_SEED: &[u8] = b"authority";
pub const LIQUIDITY_SEED: &[u8] = b"liquidity";

/// Derive an identity from a seed list. Same inputs, same key.
pub fn derive(program_id: &Pubkey, seeds: &[&[u8]]) -> Pubkey {
    Pubkey::find_program_address(seeds, program_id).0
}

pub fn amm_address(program_id: &Pubkey, launch_id: &Pubkey) -> Pubkey {
    derive(program_id, &[launch_id.as_ref()])
}

pub fn pool_address(program_id: &Pubkey, amm: &Pubkey, base_mint: &Pubkey) -> Pubkey {
    derive(program_id, &[amm.as_ref(), base_mint.as_ref()])
}

pub fn pool_authority_address(program_id: &Pubkey, amm: &Pubkey, base_mint: &Pubkey) -> Pubkey {
    derive(program_id, &[amm.as_ref(), base_mint.as_ref(), AUTHORITY_SEED])
}

pub fn liquidity_mint_address(program_id: &Pubkey, amm: &Pubkey, base_mint: &Pubkey) -> Pubkey {
    derive(program_id, &[amm.as_ref(), base_mint.as_ref(), LIQUIDITY_SEED])
}

/// All identities belonging to one (amm, base mint) pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAddresses {
    pub pool: Pubkey,
    pub authority: Pubkey,
    pub liquidity_mint: Pubkey,
}

impl PoolAddresses {
    pub fn derive(program_id: &Pubkey, amm: &Pubkey, base_mint: &Pubkey) -> Self {
        Self {
            pool: pool_address(program_id, amm, base_mint),
            authority: pool_authority_address(program_id, amm, base_mint),
            liquidity_mint: liquidity_mint_address(program_id, amm, base_mint),
        }
    }
}
