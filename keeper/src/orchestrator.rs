//! Moves a finished launch pool to the external venue and locks its liquidity
//!
//! A migration runs three steps against the venue, each retried on its own:
//!
//! 1. create the order book market, then wait for it to settle
//! 2. derive the external pool keys and seed the pool with the frozen reserves
//! 3. burn every external receipt the pool authority holds
//!
//! Progress is kept per pool, so a failed run resumes at the failed step.
//! The market identity is derived from the pool, so a retried or restarted
//! run finds the market it already opened. Once the reserves are drained the
//! ledger holds the handoff, and a keeper with no local progress picks the
//! migration up at the lock. Once a pool is locked the ledger holds the
//! summary and further runs return it without touching the venue.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use launchpad_amm::{Ledger, MigrationHandoff, MigrationSummary, PoolStatus};
use launchpad_common::LaunchpadError;
use parking_lot::Mutex;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::config::Config;
use crate::record::{InvalidTransition, MigrationRecord, MigrationStep};
use crate::retry::{with_retry, RetryPolicy};
use crate::venue::{DexVenue, MarketParams, PoolSeed, VenueError};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("pool is not ready to migrate: {0}")]
    NotReady(LaunchpadError),
    #[error("migration already running for pool {0}")]
    InProgress(Pubkey),
    #[error("ledger rejected migration: {0}")]
    Ledger(#[from] LaunchpadError),
    /// `step` is the step that did not complete
    #[error("migration failed before reaching {step:?}: {cause}")]
    Failed { step: MigrationStep, cause: VenueError },
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSettings {
    pub retry: RetryPolicy,
    pub settle_delay: Duration,
    pub quote_mint: Pubkey,
    /// Owner of the markets this keeper opens
    pub market_program: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub min_quote_reserve: u64,
}

impl From<&Config> for MigrationSettings {
    fn from(config: &Config) -> Self {
        Self {
            retry: config.retry_policy(),
            settle_delay: config.settle_delay(),
            quote_mint: config.quote_mint,
            market_program: config.market_program,
            base_lot_size: config.market.base_lot_size,
            quote_lot_size: config.market.quote_lot_size,
            min_quote_reserve: config.migration_quote_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    #[serde(serialize_with = "as_base58")]
    pub pool: Pubkey,
    #[serde(serialize_with = "as_base58")]
    pub market: Pubkey,
    #[serde(serialize_with = "as_base58")]
    pub external_pool: Pubkey,
    #[serde(serialize_with = "as_base58")]
    pub external_lp_mint: Pubkey,
    pub burned: u64,
    pub locked_at: i64,
}

impl MigrationOutcome {
    fn from_summary(pool: Pubkey, summary: &MigrationSummary) -> Self {
        Self {
            pool,
            market: summary.market,
            external_pool: summary.external_pool,
            external_lp_mint: summary.external_lp_mint,
            burned: summary.burned,
            locked_at: summary.locked_at,
        }
    }
}

fn as_base58<S: serde::Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

/// Marks a pool as being migrated until dropped
struct InFlight<'a> {
    pools: &'a Mutex<HashSet<Pubkey>>,
    pool: Pubkey,
}

impl<'a> InFlight<'a> {
    fn claim(pools: &'a Mutex<HashSet<Pubkey>>, pool: Pubkey) -> Result<Self, MigrationError> {
        if !pools.lock().insert(pool) {
            return Err(MigrationError::InProgress(pool));
        }
        Ok(Self { pools, pool })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.pools.lock().remove(&self.pool);
    }
}

pub struct Migrator<V> {
    ledger: Arc<Ledger>,
    venue: Arc<V>,
    settings: MigrationSettings,
    records: Mutex<HashMap<Pubkey, MigrationRecord>>,
    in_flight: Mutex<HashSet<Pubkey>>,
}

impl<V: DexVenue> Migrator<V> {
    pub fn new(ledger: Arc<Ledger>, venue: Arc<V>, settings: MigrationSettings) -> Self {
        Self {
            ledger,
            venue,
            settings,
            records: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Progress of an unfinished migration
    pub fn record(&self, pool: &Pubkey) -> Option<MigrationRecord> {
        self.records.lock().get(pool).cloned()
    }

    /// Migrate `pool`, resuming a previous failed run if there is one
    pub async fn migrate(&self, pool: Pubkey) -> Result<MigrationOutcome, MigrationError> {
        let _claim = InFlight::claim(&self.in_flight, pool)?;

        let current = self.ledger.snapshot(&pool)?;
        if let (PoolStatus::Locked, Some(summary)) = (current.status, &current.migration) {
            log::info!("Pool {} already locked, nothing to do", pool);
            return Ok(MigrationOutcome::from_summary(pool, summary));
        }

        let existing = self.records.lock().get(&pool).cloned();
        let mut record = match existing {
            Some(record) => {
                log::info!("Resuming migration of pool {} after {:?}", pool, record.step);
                record
            }
            None if current.status == PoolStatus::Migrated => {
                log::info!("Pool {} already drained, resuming at the lock", pool);
                let record = MigrationRecord::drained(current).ok_or(LaunchpadError::InvalidPoolStatus)?;
                self.store(&record);
                record
            }
            None => self.freeze(&pool).await?,
        };

        loop {
            match record.step {
                MigrationStep::Init => self.create_market(&mut record).await?,
                MigrationStep::MarketCreated => self.seed_external_pool(&mut record).await?,
                MigrationStep::PoolInitialized => {
                    let outcome = self.lock_liquidity(&mut record).await?;
                    self.records.lock().remove(&pool);
                    return Ok(outcome);
                }
                MigrationStep::Locked => {
                    // Locked records are never stored; trust the ledger
                    self.records.lock().remove(&pool);
                    let snapshot = self.ledger.snapshot(&pool)?;
                    let summary = snapshot.migration.ok_or(LaunchpadError::InvalidPoolStatus)?;
                    return Ok(MigrationOutcome::from_summary(pool, &summary));
                }
            }
        }
    }

    /// Halt trading and capture the reserves that seed the external pool
    async fn freeze(&self, pool: &Pubkey) -> Result<MigrationRecord, MigrationError> {
        let min = self.settings.min_quote_reserve;
        let ledger = &self.ledger;
        let frozen = with_retry(&self.settings.retry, "begin migration", move || async move {
            ledger.begin_migration(pool, min)
        })
        .await
        .map_err(|e| match e {
            LaunchpadError::LaunchIncomplete { .. } | LaunchpadError::PoolUninitialized => {
                MigrationError::NotReady(e)
            }
            other => MigrationError::Ledger(other),
        })?;

        let record = MigrationRecord::new(frozen);
        self.store(&record);
        Ok(record)
    }

    /// Market account for a pool, the same on every run
    pub fn market_address(&self, pool: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[pool.as_ref(), b"market"], &self.settings.market_program).0
    }

    fn store(&self, record: &MigrationRecord) {
        self.records.lock().insert(record.pool, record.clone());
    }

    async fn create_market(&self, record: &mut MigrationRecord) -> Result<(), MigrationError> {
        let failed = |cause| MigrationError::Failed {
            step: MigrationStep::MarketCreated,
            cause,
        };
        let retry = &self.settings.retry;
        let venue = &*self.venue;
        let owner = record.frozen.authority;
        let base_mint = record.frozen.base_mint;
        let quote_mint = self.settings.quote_mint;

        for mint in [base_mint, quote_mint] {
            with_retry(retry, "ensure token account", move || async move {
                venue.ensure_token_account(&owner, &mint).await
            })
            .await
            .map_err(failed)?;
        }

        let params = MarketParams {
            market: self.market_address(&record.pool),
            base_mint,
            quote_mint,
            base_lot_size: self.settings.base_lot_size,
            quote_lot_size: self.settings.quote_lot_size,
        };
        let market = with_retry(retry, "create market", move || venue.create_market(params))
            .await
            .map_err(failed)?;
        log::info!("Market {} created for pool {}", market, record.pool);

        record.market = Some(market);
        record.advance(MigrationStep::MarketCreated)?;
        self.store(record);

        if !self.settings.settle_delay.is_zero() {
            log::info!("Waiting {:?} for market {} to settle", self.settings.settle_delay, market);
            tokio::time::sleep(self.settings.settle_delay).await;
        }
        Ok(())
    }

    async fn seed_external_pool(&self, record: &mut MigrationRecord) -> Result<(), MigrationError> {
        let failed = |cause| MigrationError::Failed {
            step: MigrationStep::PoolInitialized,
            cause,
        };
        let retry = &self.settings.retry;
        let venue = &*self.venue;
        let market = record.market.ok_or(InvalidTransition {
            from: record.step,
            to: MigrationStep::PoolInitialized,
        })?;
        let owner = record.frozen.authority;

        let keys = match record.keys {
            Some(keys) => keys,
            None => {
                let keys = with_retry(retry, "derive pool keys", move || async move {
                    venue.pool_keys(&market).await
                })
                .await
                .map_err(failed)?;
                record.keys = Some(keys);
                self.store(record);
                keys
            }
        };

        with_retry(retry, "ensure receipt account", move || async move {
            venue.ensure_token_account(&owner, &keys.lp_mint).await
        })
        .await
        .map_err(failed)?;

        let seed = PoolSeed {
            keys,
            nonce: keys.nonce,
            open_time: 0,
            base_amount: record.frozen.base_reserve,
            quote_amount: record.frozen.quote_reserve,
            owner,
        };
        with_retry(retry, "initialize pool", move || async move {
            // A lost confirmation leaves the pool created; don't seed it twice
            if venue.is_pool_initialized(&keys.id).await? {
                return Ok(());
            }
            venue.initialize_pool(seed).await
        })
        .await
        .map_err(failed)?;
        log::info!(
            "External pool {} seeded with base={} quote={}",
            keys.id,
            seed.base_amount,
            seed.quote_amount
        );

        let handoff = MigrationHandoff {
            market,
            external_pool: keys.id,
            external_lp_mint: keys.lp_mint,
            base_amount: seed.base_amount,
            quote_amount: seed.quote_amount,
        };
        let ledger = &self.ledger;
        let pool = record.pool;
        with_retry(retry, "drain pool", move || async move {
            ledger.complete_drain(&pool, handoff).map(|_| ())
        })
        .await?;

        record.handoff = Some(handoff);
        record.advance(MigrationStep::PoolInitialized)?;
        self.store(record);
        Ok(())
    }

    async fn lock_liquidity(&self, record: &mut MigrationRecord) -> Result<MigrationOutcome, MigrationError> {
        let failed = |cause| MigrationError::Failed {
            step: MigrationStep::Locked,
            cause,
        };
        let retry = &self.settings.retry;
        let venue = &*self.venue;
        let handoff = record.handoff.ok_or(InvalidTransition {
            from: record.step,
            to: MigrationStep::Locked,
        })?;
        let lp_mint = handoff.external_lp_mint;
        let owner = record.frozen.authority;
        let observed = Cell::new(record.burned);
        let observed = &observed;

        let burn = with_retry(retry, "burn receipts", move || async move {
            // Read the live balance every attempt so a burn that landed
            // without confirmation is not repeated
            let balance = venue.lp_balance(&lp_mint, &owner).await?;
            if balance == 0 {
                return Ok(());
            }
            observed.set(observed.get().max(balance));
            venue.burn(&lp_mint, &owner, balance).await
        })
        .await;
        record.burned = observed.get();
        if let Err(cause) = burn {
            self.store(record);
            return Err(failed(cause));
        }

        let summary = MigrationSummary {
            market: handoff.market,
            external_pool: handoff.external_pool,
            external_lp_mint: lp_mint,
            burned: record.burned,
            locked_at: chrono::Utc::now().timestamp(),
        };
        let ledger = &self.ledger;
        let pool = record.pool;
        let locked = with_retry(retry, "finalize lock", move || async move {
            ledger.finalize_lock(&pool, summary)
        })
        .await?;
        record.advance(MigrationStep::Locked)?;

        // The ledger keeps the first summary if someone else finished first
        let summary = locked.migration.unwrap_or(summary);
        log::info!(
            "Pool {} migrated to {} and locked ({} receipts burned)",
            pool,
            summary.external_pool,
            summary.burned
        );
        Ok(MigrationOutcome::from_summary(pool, &summary))
    }
}
