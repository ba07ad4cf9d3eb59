//! Launchpad integration tests
//!
//! Drives the ledger, swap engine, liquidity manager and migration keeper
//! together against the in-memory venue.

use std::sync::Arc;
use std::time::Duration;

pub use launchpad_amm::testing::{Launch, DEPOSIT_BASE, TRADER_QUOTE};
use launchpad_amm::{Ledger, SwapOutcome, SwapRequest};
use launchpad_common::{Asset, Direction, LaunchpadResult, BOOTSTRAP_QUOTE};
use launchpad_keeper::{InMemoryVenue, MigrationSettings, Migrator, RetryPolicy};
use solana_sdk::pubkey::Pubkey;

/// Keeper settings with the production retry shape and no settle wait
pub fn keeper_settings() -> MigrationSettings {
    MigrationSettings {
        retry: RetryPolicy::fixed(5, Duration::from_secs(2)),
        settle_delay: Duration::ZERO,
        quote_mint: Pubkey::new_unique(),
        market_program: Pubkey::new_unique(),
        base_lot_size: 1,
        quote_lot_size: 1,
        min_quote_reserve: BOOTSTRAP_QUOTE,
    }
}

pub fn keeper(ledger: &Arc<Ledger>) -> (Migrator<InMemoryVenue>, Arc<InMemoryVenue>) {
    let venue = Arc::new(InMemoryVenue::new(Pubkey::new_unique(), Pubkey::new_unique()));
    let migrator = Migrator::new(Arc::clone(ledger), Arc::clone(&venue), keeper_settings());
    (migrator, venue)
}

pub fn buy(ledger: &Ledger, pool: Pubkey, trader: Pubkey, quote_in: u64) -> LaunchpadResult<SwapOutcome> {
    ledger.swap_exact_in(SwapRequest {
        pool,
        direction: Direction::QuoteToBase,
        amount_in: quote_in,
        min_amount_out: 0,
        trader,
    })
}

pub fn sell(ledger: &Ledger, pool: Pubkey, trader: Pubkey, base_in: u64) -> LaunchpadResult<SwapOutcome> {
    ledger.swap_exact_in(SwapRequest {
        pool,
        direction: Direction::BaseToQuote,
        amount_in: base_in,
        min_amount_out: 0,
        trader,
    })
}

/// Everything of `asset` the ledger accounts for: holders plus pool reserves
pub fn accounted(ledger: &Ledger, pools: &[Pubkey], asset: Asset) -> u128 {
    let reserves: u128 = pools
        .iter()
        .map(|pool| {
            let snapshot = ledger.snapshot(pool).unwrap();
            match asset {
                Asset::Quote => snapshot.quote_reserve as u128,
                Asset::Base(mint) if mint == snapshot.base_mint => snapshot.base_reserve as u128,
                Asset::Base(_) => 0,
            }
        })
        .sum();
    ledger.circulating(asset) + reserves
}
