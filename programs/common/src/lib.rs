//! Shared types for the launchpad AMM and its migration keeper
//!
//! Everything here is pure: identities, seed derivation, launch constants and
//! the error taxonomy used by the ledger.

pub mod constants;
pub mod error;
pub mod seeds;
pub mod types;

pub use constants::*;
pub use error::*;
pub use seeds::*;
pub use types::*;

pub use solana_program::pubkey::Pubkey;
