//! End-to-end launch scenarios: create, seed, trade, migrate, lock

use std::sync::Arc;

use launchpad_amm::{
    CreatePoolRequest, DepositRequest, PoolStatus, SwapRequest, WithdrawRequest,
};
use launchpad_common::{
    Asset, Direction, LaunchpadError, BOOTSTRAP_QUOTE, LAMPORTS_PER_SOL, MINIMUM_LIQUIDITY,
};
use launchpad_integration_tests::*;
use launchpad_keeper::{MigrationError, MigrationStep, Migrator, VenueError, VenueOp};

/// Pool keys derived for another mint must not open a pool for this one
#[test]
fn test_invalid_mints() {
    let launch = Launch::new();
    let ledger = &launch.ledger;
    let other_mint = solana_sdk::pubkey::Pubkey::new_unique();
    ledger.mint_launch_supply(other_mint, launch.admin).unwrap();

    let foreign = ledger.pool_addresses(&launch.amm, &other_mint);
    let result = ledger.create_pool(CreatePoolRequest {
        amm: launch.amm,
        base_mint: launch.mint,
        pool: foreign.pool,
        authority: foreign.authority,
    });

    assert_eq!(result, Err(LaunchpadError::InvalidMint));
    assert_eq!(ledger.snapshot(&foreign.pool).unwrap_err(), LaunchpadError::UnknownPool);
}

#[test]
fn test_buy_charges_treasury_one_percent() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    let treasury = ledger.treasury();
    let trader_before = ledger.balance(&launch.trader, Asset::Quote);

    let fill = buy(ledger, launch.pool, launch.trader, LAMPORTS_PER_SOL).unwrap();

    assert_eq!(ledger.balance(&treasury, Asset::Quote), LAMPORTS_PER_SOL / 100);
    assert_eq!(
        trader_before - ledger.balance(&launch.trader, Asset::Quote),
        LAMPORTS_PER_SOL + LAMPORTS_PER_SOL / 100
    );
    assert_eq!(ledger.balance(&launch.trader, Asset::Base(launch.mint)), fill.amount_out);

    println!("bought {} base for {} lamports", fill.amount_out, fill.total_debited);
}

/// Asking for more than the curve can give fails and moves nothing
#[test]
fn test_buy_too_many_tokens() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    let before = ledger.snapshot(&launch.pool).unwrap();
    let trader_quote = ledger.balance(&launch.trader, Asset::Quote);

    let reachable = ledger
        .quote(&launch.pool, Direction::QuoteToBase, LAMPORTS_PER_SOL)
        .unwrap()
        .amount_out;
    let result = ledger.swap_exact_in(SwapRequest {
        pool: launch.pool,
        direction: Direction::QuoteToBase,
        amount_in: LAMPORTS_PER_SOL,
        min_amount_out: reachable + 1,
        trader: launch.trader,
    });

    assert_eq!(
        result,
        Err(LaunchpadError::SlippageExceeded {
            minimum: reachable + 1,
            actual: reachable
        })
    );
    assert_eq!(ledger.snapshot(&launch.pool).unwrap(), before);
    assert_eq!(ledger.balance(&launch.trader, Asset::Quote), trader_quote);
    assert_eq!(ledger.balance(&ledger.treasury(), Asset::Quote), 0);
}

/// A sell minimum is expressed in quote, the asset the seller receives
#[test]
fn test_sell_minimum_in_quote_units() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    let bought = buy(ledger, launch.pool, launch.trader, 2 * LAMPORTS_PER_SOL).unwrap().amount_out;
    // Leave room for the treasury skim, which is taken in base on a sell
    let amount_in = bought / 101 * 100;

    let quote = ledger.quote(&launch.pool, Direction::BaseToQuote, amount_in).unwrap();
    assert!(quote.amount_out < 2 * LAMPORTS_PER_SOL);
    assert!(quote.total_cost <= bought);

    let fill = ledger
        .swap_exact_in(SwapRequest {
            pool: launch.pool,
            direction: Direction::BaseToQuote,
            amount_in,
            min_amount_out: quote.amount_out,
            trader: launch.trader,
        })
        .unwrap();
    assert_eq!(fill.amount_out, quote.amount_out);
    assert_eq!(
        ledger.balance(&launch.trader, Asset::Base(launch.mint)),
        bought - fill.total_debited
    );
}

#[test]
fn test_k_never_decreases_over_session() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    let mut k = ledger.snapshot(&launch.pool).unwrap().invariant();

    for round in 1..=10u64 {
        let fill = buy(ledger, launch.pool, launch.trader, round * LAMPORTS_PER_SOL / 4).unwrap();
        let after_buy = ledger.snapshot(&launch.pool).unwrap().invariant();
        assert!(after_buy >= k);

        sell(ledger, launch.pool, launch.trader, fill.amount_out / 2).unwrap();
        let after_sell = ledger.snapshot(&launch.pool).unwrap().invariant();
        assert!(after_sell >= after_buy);
        k = after_sell;
    }
}

/// A non-creator provider joins, then leaves with its share
#[test]
fn test_follow_up_provider_round_trip() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    let base = buy(ledger, launch.pool, launch.trader, 5 * LAMPORTS_PER_SOL).unwrap().amount_out;
    let quote_before = ledger.balance(&launch.trader, Asset::Quote);

    let amount_base = base / 2;
    let amount_quote = ledger.deposit_quote_for(&launch.pool, amount_base).unwrap();
    let minted = ledger
        .deposit(DepositRequest {
            pool: launch.pool,
            amount_base,
            amount_quote,
            depositor: launch.trader,
        })
        .unwrap()
        .receipts_minted;
    assert_eq!(ledger.receipts_of(&launch.pool, &launch.trader).unwrap(), minted);
    let pooled = ledger.snapshot(&launch.pool).unwrap();
    let base_slack = pooled.base_reserve / pooled.receipt_supply + 2;
    let quote_slack = pooled.quote_reserve / pooled.receipt_supply + 2;

    let back = ledger
        .withdraw(WithdrawRequest {
            pool: launch.pool,
            receipts: minted,
            holder: launch.trader,
        })
        .unwrap();

    // Rounding never favours the provider
    assert!(back.amount_base <= amount_base);
    assert!(back.amount_quote <= amount_quote);
    assert!(amount_base - back.amount_base <= base_slack);
    assert!(amount_quote - back.amount_quote <= quote_slack);
    assert!(ledger.balance(&launch.trader, Asset::Quote) <= quote_before);
}

#[test]
fn test_first_deposit_withholds_minimum() {
    let launch = Launch::seeded();
    let snapshot = launch.ledger.snapshot(&launch.pool).unwrap();

    assert_eq!(
        launch.ledger.receipts_of(&launch.pool, &launch.authority).unwrap(),
        MINIMUM_LIQUIDITY
    );
    assert_eq!(
        launch.ledger.receipts_of(&launch.pool, &launch.admin).unwrap() + MINIMUM_LIQUIDITY,
        snapshot.receipt_supply
    );
    assert_eq!(snapshot.base_reserve, DEPOSIT_BASE);
    assert_eq!(snapshot.quote_reserve, BOOTSTRAP_QUOTE);
}

#[tokio::test(start_paused = true)]
async fn test_launch_to_lock() {
    let _ = env_logger::builder().is_test(true).try_init();
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    for amount in [LAMPORTS_PER_SOL, 3 * LAMPORTS_PER_SOL, LAMPORTS_PER_SOL / 2] {
        buy(ledger, launch.pool, launch.trader, amount).unwrap();
    }
    let frozen = ledger.snapshot(&launch.pool).unwrap();
    let (migrator, venue) = keeper(ledger);

    let outcome = migrator.migrate(launch.pool).await.unwrap();

    let external = venue.pool(&outcome.external_pool).unwrap();
    assert_eq!(external.base_reserve, frozen.base_reserve);
    assert_eq!(external.quote_reserve, frozen.quote_reserve);
    assert_eq!(external.lp_supply, 0, "no receipt left to redeem");

    let locked = ledger.snapshot(&launch.pool).unwrap();
    assert_eq!(locked.status, PoolStatus::Locked);
    assert_eq!(locked.receipt_supply, frozen.receipt_supply, "pool record kept for audit");
    assert_eq!(locked.migration.unwrap().external_pool, outcome.external_pool);

    // Neither trading nor withdrawal reopens
    assert_eq!(
        buy(ledger, launch.pool, launch.trader, LAMPORTS_PER_SOL),
        Err(LaunchpadError::PoolLocked)
    );
    assert_eq!(
        ledger
            .withdraw(WithdrawRequest {
                pool: launch.pool,
                receipts: 1,
                holder: launch.admin,
            })
            .unwrap_err(),
        LaunchpadError::PoolLocked
    );

    // Lock is idempotent
    let burns = venue.calls(VenueOp::Burn);
    assert_eq!(migrator.migrate(launch.pool).await.unwrap(), outcome);
    assert_eq!(venue.calls(VenueOp::Burn), burns);
}

#[tokio::test(start_paused = true)]
async fn test_failed_migration_resumes() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    buy(ledger, launch.pool, launch.trader, LAMPORTS_PER_SOL).unwrap();
    let (migrator, venue) = keeper(ledger);

    venue.fail_next(VenueOp::PoolKeys, 5);
    match migrator.migrate(launch.pool).await {
        Err(MigrationError::Failed { step, cause }) => {
            assert_eq!(step, MigrationStep::PoolInitialized);
            assert!(matches!(cause, VenueError::Transient(_)));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(ledger.snapshot(&launch.pool).unwrap().status, PoolStatus::Migrating);
    assert_eq!(
        buy(ledger, launch.pool, launch.trader, LAMPORTS_PER_SOL),
        Err(LaunchpadError::PoolLocked)
    );

    let outcome = migrator.migrate(launch.pool).await.unwrap();
    assert_eq!(venue.market_count(), 1);
    assert_eq!(ledger.snapshot(&launch.pool).unwrap().status, PoolStatus::Locked);
    assert!(outcome.burned > 0);
}

#[tokio::test(start_paused = true)]
async fn test_lock_waits_for_threshold() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    let (migrator, venue) = keeper(ledger);
    let mut settings = *migrator.settings();
    settings.min_quote_reserve = BOOTSTRAP_QUOTE + 5 * LAMPORTS_PER_SOL;
    let migrator = Migrator::new(Arc::clone(ledger), venue, settings);

    assert!(matches!(
        migrator.migrate(launch.pool).await,
        Err(MigrationError::NotReady(_))
    ));

    buy(ledger, launch.pool, launch.trader, 6 * LAMPORTS_PER_SOL).unwrap();
    migrator.migrate(launch.pool).await.unwrap();
}

/// The keeper dies after the drain; a new one on the same ledger finishes the lock
#[tokio::test(start_paused = true)]
async fn test_drained_pool_locked_by_new_keeper() {
    let launch = Launch::seeded();
    let ledger = &launch.ledger;
    buy(ledger, launch.pool, launch.trader, 2 * LAMPORTS_PER_SOL).unwrap();
    let (migrator, venue) = keeper(ledger);

    venue.fail_next(VenueOp::Burn, 5);
    assert!(matches!(
        migrator.migrate(launch.pool).await,
        Err(MigrationError::Failed { step: MigrationStep::Locked, .. })
    ));
    drop(migrator);
    assert_eq!(ledger.snapshot(&launch.pool).unwrap().status, PoolStatus::Migrated);

    let replacement = Migrator::new(Arc::clone(ledger), Arc::clone(&venue), keeper_settings());
    let outcome = replacement.migrate(launch.pool).await.unwrap();

    assert_eq!(venue.pool(&outcome.external_pool).unwrap().lp_supply, 0);
    assert_eq!(venue.market_count(), 1);
    let locked = ledger.snapshot(&launch.pool).unwrap();
    assert_eq!(locked.status, PoolStatus::Locked);
    assert_eq!(locked.handoff.unwrap().external_pool, outcome.external_pool);
}
