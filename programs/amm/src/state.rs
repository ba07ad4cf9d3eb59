//! Ledger state - launch configs and constant product pools

use std::collections::HashMap;

use launchpad_common::{LaunchpadError, PoolAddresses, Pubkey};
use serde::{Deserialize, Serialize};

use crate::math;

/// Launch configuration, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmConfig {
    /// Caller-chosen launch id
    pub id: Pubkey,

    /// Derived from `[id]`
    pub key: Pubkey,

    /// Pool fee in basis points, retained in the reserves
    pub fee_bps: u16,

    /// Cap on any wallet's base holding after a buy
    pub max_per_wallet: u64,

    pub admin: Pubkey,
}

/// Where a pool is in its launch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    /// Open for deposits, withdrawals and swaps
    Active,
    /// Snapshot taken for migration; trading halted
    Migrating,
    /// Reserves handed to the external venue
    Migrated,
    /// External receipts burned. Terminal.
    Locked,
}

impl PoolStatus {
    pub fn is_trading(self) -> bool {
        self == PoolStatus::Active
    }
}

/// Audit trail left on a pool once its liquidity is locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub market: Pubkey,
    pub external_pool: Pubkey,
    pub external_lp_mint: Pubkey,
    /// External receipts destroyed by the lock
    pub burned: u64,
    /// Unix seconds
    pub locked_at: i64,
}

/// Where a drained pool's reserves went. Written by the drain so that any
/// keeper can finish the lock, even one that did not run the earlier steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationHandoff {
    pub market: Pubkey,
    pub external_pool: Pubkey,
    pub external_lp_mint: Pubkey,
    /// Reserves moved out at the drain
    pub base_amount: u64,
    pub quote_amount: u64,
}

/// Constant product pool for one (amm, base mint) pair
#[derive(Debug, Clone)]
pub struct Pool {
    pub key: Pubkey,
    pub amm: Pubkey,
    pub base_mint: Pubkey,

    /// Derived signer; the only identity allowed to mint receipts
    pub authority: Pubkey,

    /// Derived identity of the receipt token
    pub liquidity_mint: Pubkey,

    /// Base reserve (x in x·y=k)
    pub base_reserve: u64,

    /// Quote reserve (y in x·y=k)
    pub quote_reserve: u64,

    /// Receipts outstanding; always equal to the sum of `receipts`
    pub receipt_supply: u64,

    pub(crate) receipts: HashMap<Pubkey, u64>,

    pub status: PoolStatus,

    /// Bumped on every committed mutation
    pub seqno: u64,

    /// Set by the drain, kept after the lock
    pub handoff: Option<MigrationHandoff>,

    pub migration: Option<MigrationSummary>,
}

impl Pool {
    pub fn new(amm: Pubkey, base_mint: Pubkey, addrs: PoolAddresses) -> Self {
        Self {
            key: addrs.pool,
            amm,
            base_mint,
            authority: addrs.authority,
            liquidity_mint: addrs.liquidity_mint,
            base_reserve: 0,
            quote_reserve: 0,
            receipt_supply: 0,
            receipts: HashMap::new(),
            status: PoolStatus::Active,
            seqno: 0,
            handoff: None,
            migration: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.base_reserve > 0 && self.quote_reserve > 0
    }

    /// Reserves as (input, output) for a trade direction
    pub fn reserves_for(&self, input_is_base: bool) -> (u64, u64) {
        if input_is_base {
            (self.base_reserve, self.quote_reserve)
        } else {
            (self.quote_reserve, self.base_reserve)
        }
    }

    pub fn receipts_of(&self, holder: &Pubkey) -> u64 {
        self.receipts.get(holder).copied().unwrap_or(0)
    }

    /// Iterate (holder, balance) pairs with a non-zero balance
    pub fn receipt_holders(&self) -> impl Iterator<Item = (&Pubkey, &u64)> {
        self.receipts.iter().filter(|(_, amount)| **amount > 0)
    }

    /// Spot price of base in quote, scaled by `math::SCALE`
    pub fn spot_price(&self) -> Result<u64, LaunchpadError> {
        math::spot_price(self.base_reserve, self.quote_reserve)
    }

    pub fn ensure_trading(&self) -> Result<(), LaunchpadError> {
        if self.status.is_trading() {
            Ok(())
        } else {
            Err(LaunchpadError::PoolLocked)
        }
    }

    pub(crate) fn bump(&mut self) {
        self.seqno = self.seqno.wrapping_add(1);
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            key: self.key,
            amm: self.amm,
            base_mint: self.base_mint,
            authority: self.authority,
            liquidity_mint: self.liquidity_mint,
            base_reserve: self.base_reserve,
            quote_reserve: self.quote_reserve,
            receipt_supply: self.receipt_supply,
            status: self.status,
            seqno: self.seqno,
            handoff: self.handoff,
            migration: self.migration,
        }
    }
}

/// Consistent copy of a pool, safe to hold without the pool lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub key: Pubkey,
    pub amm: Pubkey,
    pub base_mint: Pubkey,
    pub authority: Pubkey,
    pub liquidity_mint: Pubkey,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub receipt_supply: u64,
    pub status: PoolStatus,
    pub seqno: u64,
    pub handoff: Option<MigrationHandoff>,
    pub migration: Option<MigrationSummary>,
}

impl PoolSnapshot {
    /// k = base · quote, widened
    pub fn invariant(&self) -> u128 {
        math::invariant(self.base_reserve, self.quote_reserve)
    }
}
