//! Pool ledger - registry of launch configs and pools
//!
//! Each pool sits behind its own mutex. Every mutation runs as one
//! "lock, read, compute, write" unit via [`Ledger::transact`], so requests on
//! the same pool are linearized while different pools proceed in parallel.
//! The balance book has a single mutex that is only ever taken after a pool
//! lock, never before.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use launchpad_common::{
    amm_address, Asset, LaunchpadError, PoolAddresses, Pubkey, BPS_SCALE, TOTAL_SUPPLY,
};
use parking_lot::Mutex;

use crate::book::{Posting, TokenBook};
use crate::state::{AmmConfig, MigrationHandoff, MigrationSummary, Pool, PoolSnapshot, PoolStatus};

type Result<T> = core::result::Result<T, LaunchpadError>;

/// How long a request waits for a contended pool before giving up with `Busy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub attempts: u32,
    pub wait: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 8,
            wait: Duration::from_millis(25),
        }
    }
}

/// Launch creation request
#[derive(Debug, Clone, Copy)]
pub struct CreateAmmRequest {
    pub launch_id: Pubkey,
    pub fee_bps: u16,
    pub max_per_wallet: u64,
    pub admin: Pubkey,
}

/// Pool creation request. `pool` and `authority` are the keys the caller
/// claims; they must match the `(amm, base_mint)` derivation.
#[derive(Debug, Clone, Copy)]
pub struct CreatePoolRequest {
    pub amm: Pubkey,
    pub base_mint: Pubkey,
    pub pool: Pubkey,
    pub authority: Pubkey,
}

pub struct Ledger {
    program_id: Pubkey,
    treasury: Pubkey,
    amms: DashMap<Pubkey, AmmConfig>,
    pools: DashMap<Pubkey, Arc<Mutex<Pool>>>,
    book: Mutex<TokenBook>,
    lock_policy: LockPolicy,
}

impl Ledger {
    pub fn new(program_id: Pubkey, treasury: Pubkey) -> Self {
        Self::with_lock_policy(program_id, treasury, LockPolicy::default())
    }

    pub fn with_lock_policy(program_id: Pubkey, treasury: Pubkey, lock_policy: LockPolicy) -> Self {
        Self {
            program_id,
            treasury,
            amms: DashMap::new(),
            pools: DashMap::new(),
            book: Mutex::new(TokenBook::new()),
            lock_policy,
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Identity credited with the per-swap treasury skim
    pub fn treasury(&self) -> Pubkey {
        self.treasury
    }

    pub fn pool_addresses(&self, amm: &Pubkey, base_mint: &Pubkey) -> PoolAddresses {
        PoolAddresses::derive(&self.program_id, amm, base_mint)
    }

    /// Register a launch. The config key is derived from the launch id.
    pub fn create_amm(&self, req: CreateAmmRequest) -> Result<Pubkey> {
        if req.fee_bps as u64 >= BPS_SCALE {
            return Err(LaunchpadError::InvalidFee(req.fee_bps));
        }

        let key = amm_address(&self.program_id, &req.launch_id);
        match self.amms.entry(key) {
            Entry::Occupied(_) => Err(LaunchpadError::DuplicateId),
            Entry::Vacant(slot) => {
                slot.insert(AmmConfig {
                    id: req.launch_id,
                    key,
                    fee_bps: req.fee_bps,
                    max_per_wallet: req.max_per_wallet,
                    admin: req.admin,
                });
                log::info!("Created amm {} (fee {} bps, admin {})", key, req.fee_bps, req.admin);
                Ok(key)
            }
        }
    }

    pub fn amm(&self, key: &Pubkey) -> Result<AmmConfig> {
        self.amms
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(LaunchpadError::UnknownAmm)
    }

    /// Mint the fixed launch supply of `mint` to `creator`
    pub fn mint_launch_supply(&self, mint: Pubkey, creator: Pubkey) -> Result<()> {
        self.book.lock().launch(mint, creator, TOTAL_SUPPLY)?;
        log::info!("Minted {} of {} to {}", TOTAL_SUPPLY, mint, creator);
        Ok(())
    }

    /// Credit native quote to a holder
    pub fn fund_quote(&self, holder: Pubkey, amount: u64) -> Result<()> {
        self.book.lock().apply(&[Posting::credit(holder, Asset::Quote, amount)])
    }

    pub fn balance(&self, holder: &Pubkey, asset: Asset) -> u64 {
        self.book.lock().balance(holder, asset)
    }

    /// Sum of every holder's balance of an asset (pool reserves excluded)
    pub fn circulating(&self, asset: Asset) -> u128 {
        self.book.lock().total(asset)
    }

    /// Create an empty pool. Rejects claimed keys that were derived from
    /// anything other than `(amm, base_mint)`.
    pub fn create_pool(&self, req: CreatePoolRequest) -> Result<Pubkey> {
        self.amm(&req.amm)?;

        let addrs = self.pool_addresses(&req.amm, &req.base_mint);
        if req.pool != addrs.pool || req.authority != addrs.authority {
            log::warn!("Rejected pool {} for mint {}: derivation mismatch", req.pool, req.base_mint);
            return Err(LaunchpadError::InvalidMint);
        }
        if !self.book.lock().is_launched(&req.base_mint) {
            return Err(LaunchpadError::InvalidMint);
        }

        match self.pools.entry(addrs.pool) {
            Entry::Occupied(_) => Err(LaunchpadError::PoolExists),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Pool::new(req.amm, req.base_mint, addrs))));
                log::info!("Created pool {} for mint {}", addrs.pool, req.base_mint);
                Ok(addrs.pool)
            }
        }
    }

    pub fn snapshot(&self, pool: &Pubkey) -> Result<PoolSnapshot> {
        self.transact(pool, |_, pool, _| Ok(pool.snapshot()))
    }

    pub fn receipts_of(&self, pool: &Pubkey, holder: &Pubkey) -> Result<u64> {
        self.transact(pool, |_, pool, _| Ok(pool.receipts_of(holder)))
    }

    /// Run `f` with exclusive access to one pool and the balance book.
    ///
    /// `f` must do all of its checks before its first write; an `Err` from `f`
    /// is returned as-is and the caller sees no partial state.
    pub fn transact<R>(
        &self,
        pool: &Pubkey,
        f: impl FnOnce(&AmmConfig, &mut Pool, &mut TokenBook) -> Result<R>,
    ) -> Result<R> {
        let cell = self
            .pools
            .get(pool)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LaunchpadError::UnknownPool)?;

        let mut attempt = 0;
        let mut guard = loop {
            if let Some(guard) = cell.try_lock_for(self.lock_policy.wait) {
                break guard;
            }
            attempt += 1;
            log::debug!("Pool {} contended (attempt {}/{})", pool, attempt, self.lock_policy.attempts);
            if attempt >= self.lock_policy.attempts {
                return Err(LaunchpadError::Busy);
            }
        };

        let config = self.amm(&guard.amm)?;
        let mut book = self.book.lock();
        f(&config, &mut guard, &mut book)
    }

    /// Freeze a pool for migration and return the reserves to seed with.
    ///
    /// Idempotent for a pool already migrating so an interrupted run can
    /// resume; later statuses are returned untouched for the caller to inspect.
    pub fn begin_migration(&self, pool: &Pubkey, min_quote_reserve: u64) -> Result<PoolSnapshot> {
        self.transact(pool, |_, pool, _| {
            if pool.status == PoolStatus::Active {
                if !pool.is_initialized() {
                    return Err(LaunchpadError::PoolUninitialized);
                }
                if pool.quote_reserve < min_quote_reserve {
                    return Err(LaunchpadError::LaunchIncomplete {
                        quote_reserve: pool.quote_reserve,
                        threshold: min_quote_reserve,
                    });
                }
                pool.status = PoolStatus::Migrating;
                pool.bump();
                log::info!(
                    "Pool {} frozen for migration at base={} quote={}",
                    pool.key,
                    pool.base_reserve,
                    pool.quote_reserve
                );
            }
            Ok(pool.snapshot())
        })
    }

    /// Hand the frozen reserves to the external venue and record where they
    /// went. The pool record stays.
    ///
    /// `handoff` must carry exactly the frozen reserves. Repeating the drain
    /// with the same handoff is a no-op.
    pub fn complete_drain(&self, pool: &Pubkey, handoff: MigrationHandoff) -> Result<PoolSnapshot> {
        self.transact(pool, |_, pool, _| {
            match pool.status {
                PoolStatus::Migrating => {
                    if (handoff.base_amount, handoff.quote_amount) != (pool.base_reserve, pool.quote_reserve) {
                        log::warn!(
                            "Pool {} drain refused: handoff base={} quote={}, reserves base={} quote={}",
                            pool.key,
                            handoff.base_amount,
                            handoff.quote_amount,
                            pool.base_reserve,
                            pool.quote_reserve
                        );
                        return Err(LaunchpadError::InvalidPoolStatus);
                    }
                    log::info!(
                        "Pool {} drained into {}: base={} quote={}",
                        pool.key,
                        handoff.external_pool,
                        pool.base_reserve,
                        pool.quote_reserve
                    );
                    pool.base_reserve = 0;
                    pool.quote_reserve = 0;
                    pool.handoff = Some(handoff);
                    pool.status = PoolStatus::Migrated;
                    pool.bump();
                }
                PoolStatus::Migrated if pool.handoff == Some(handoff) => {}
                PoolStatus::Active | PoolStatus::Migrated | PoolStatus::Locked => {
                    return Err(LaunchpadError::InvalidPoolStatus)
                }
            }
            Ok(pool.snapshot())
        })
    }

    /// Record the liquidity lock. A second call on a locked pool is a no-op.
    pub fn finalize_lock(&self, pool: &Pubkey, summary: MigrationSummary) -> Result<PoolSnapshot> {
        self.transact(pool, |_, pool, _| {
            match pool.status {
                PoolStatus::Migrated => {
                    if let Some(handoff) = pool.handoff {
                        if (handoff.market, handoff.external_pool, handoff.external_lp_mint)
                            != (summary.market, summary.external_pool, summary.external_lp_mint)
                        {
                            return Err(LaunchpadError::InvalidPoolStatus);
                        }
                    }
                    log::info!("Pool {} locked: {} external receipts burned", pool.key, summary.burned);
                    pool.migration = Some(summary);
                    pool.status = PoolStatus::Locked;
                    pool.bump();
                }
                PoolStatus::Locked => {}
                PoolStatus::Active | PoolStatus::Migrating => {
                    return Err(LaunchpadError::InvalidPoolStatus)
                }
            }
            Ok(pool.snapshot())
        })
    }
}
