//! Launchpad AMM - constant product pools for token launches (x·y=k)
//!
//! One pool per launched token, paired against the shared quote asset:
//! - `math`: widened integer arithmetic, fee-on-input pricing
//! - `ledger`: configs, pools and per-pool serialization
//! - `swap`: exact-input trades with slippage, wallet cap and treasury skim
//! - `liquidity`: receipt mint/burn on deposit and withdrawal
//! - `book`: holder balances outside the pools

pub mod book;
pub mod ledger;
pub mod liquidity;
pub mod math;
pub mod state;
pub mod swap;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;

pub use book::{Posting, TokenBook};
pub use ledger::{CreateAmmRequest, CreatePoolRequest, Ledger, LockPolicy};
pub use liquidity::{DepositOutcome, DepositRequest, WithdrawOutcome, WithdrawRequest};
pub use state::*;
pub use swap::{SwapOutcome, SwapQuote, SwapRequest};
