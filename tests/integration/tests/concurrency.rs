//! Many callers on one ledger: per-pool linearization, independent pools

use std::sync::Arc;
use std::thread;

use launchpad_amm::{Ledger, PoolStatus};
use launchpad_common::{Asset, LaunchpadError, LAMPORTS_PER_SOL};
use launchpad_integration_tests::*;
use solana_sdk::pubkey::Pubkey;

const THREADS: usize = 8;
const ROUNDS: usize = 25;

/// Contention is expected here; keep trying until the ledger admits the call
fn until_admitted<T>(mut op: impl FnMut() -> Result<T, LaunchpadError>) -> Result<T, LaunchpadError> {
    loop {
        match op() {
            Err(LaunchpadError::Busy) => thread::yield_now(),
            other => return other,
        }
    }
}

fn traders(ledger: &Ledger, n: usize) -> Vec<Pubkey> {
    (0..n)
        .map(|_| {
            let trader = Pubkey::new_unique();
            ledger.fund_quote(trader, 50 * LAMPORTS_PER_SOL).unwrap();
            trader
        })
        .collect()
}

/// Each trader buys then sells half of what it got, over and over
fn churn(ledger: &Ledger, pool: Pubkey, trader: Pubkey) {
    for round in 0..ROUNDS {
        let amount = LAMPORTS_PER_SOL / 10 + round as u64 * 1_000_000;
        let fill = until_admitted(|| buy(ledger, pool, trader, amount)).unwrap();
        until_admitted(|| sell(ledger, pool, trader, fill.amount_out / 2)).unwrap();
    }
}

#[test]
fn test_same_pool_conserves_value() {
    let launch = Launch::seeded();
    let ledger = Arc::clone(&launch.ledger);
    let pools = [launch.pool];
    let base = Asset::Base(launch.mint);
    let quote_total = accounted(&ledger, &pools, Asset::Quote);
    let base_total = accounted(&ledger, &pools, base);
    let k_before = ledger.snapshot(&launch.pool).unwrap().invariant();
    let seqno_before = ledger.snapshot(&launch.pool).unwrap().seqno;

    let handles: Vec<_> = traders(&ledger, THREADS)
        .into_iter()
        .map(|trader| {
            let ledger = Arc::clone(&ledger);
            let pool = launch.pool;
            thread::spawn(move || churn(&ledger, pool, trader))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Funding added quote after the first count; take it off again
    let funded = (THREADS as u128) * 50 * LAMPORTS_PER_SOL as u128;
    assert_eq!(accounted(&ledger, &pools, Asset::Quote), quote_total + funded);
    assert_eq!(accounted(&ledger, &pools, base), base_total);

    let after = ledger.snapshot(&launch.pool).unwrap();
    assert!(after.invariant() >= k_before);
    // Every swap committed exactly once
    assert_eq!(after.seqno - seqno_before, (THREADS * ROUNDS * 2) as u64);

    let treasury = ledger.balance(&ledger.treasury(), Asset::Quote);
    assert!(treasury > 0);
    println!("treasury after {} swaps: {}", THREADS * ROUNDS * 2, treasury);
}

#[test]
fn test_receipts_conserved_under_contention() {
    let launch = Launch::seeded();
    let ledger = Arc::clone(&launch.ledger);
    let providers = traders(&ledger, 4);
    for provider in &providers {
        buy(&ledger, launch.pool, *provider, 5 * LAMPORTS_PER_SOL).unwrap();
    }

    let handles: Vec<_> = providers
        .iter()
        .map(|&provider| {
            let ledger = Arc::clone(&ledger);
            let pool = launch.pool;
            let mint = launch.mint;
            thread::spawn(move || {
                for _ in 0..10 {
                    let amount_base = ledger.balance(&provider, Asset::Base(mint)) / 4;
                    // The price may move between quoting and depositing
                    let minted = loop {
                        let amount_quote =
                            until_admitted(|| ledger.deposit_quote_for(&pool, amount_base)).unwrap();
                        match until_admitted(|| {
                            ledger.deposit(launchpad_amm::DepositRequest {
                                pool,
                                amount_base,
                                amount_quote,
                                depositor: provider,
                            })
                        }) {
                            Ok(outcome) => break outcome.receipts_minted,
                            Err(LaunchpadError::UnbalancedDeposit { .. }) => continue,
                            Err(e) => panic!("deposit failed: {}", e),
                        }
                    };
                    until_admitted(|| {
                        ledger.withdraw(launchpad_amm::WithdrawRequest {
                            pool,
                            receipts: minted,
                            holder: provider,
                        })
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = ledger.snapshot(&launch.pool).unwrap();
    let mut held = ledger.receipts_of(&launch.pool, &launch.admin).unwrap()
        + ledger.receipts_of(&launch.pool, &launch.authority).unwrap();
    for provider in &providers {
        let receipts = ledger.receipts_of(&launch.pool, provider).unwrap();
        assert_eq!(receipts, 0);
        held += receipts;
    }
    assert_eq!(held, snapshot.receipt_supply);
}

#[test]
fn test_independent_pools_in_parallel() {
    let ledger = Arc::new(Ledger::new(Pubkey::new_unique(), Pubkey::new_unique()));
    let a = Launch::on(Arc::clone(&ledger));
    let b = Launch::on(Arc::clone(&ledger));
    a.seed();
    b.seed();

    let handles: Vec<_> = [(a.pool, a.trader), (b.pool, b.trader)]
        .into_iter()
        .map(|(pool, trader)| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || churn(&ledger, pool, trader))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Identical trade sequences on identical pools end identically
    let (sa, sb) = (ledger.snapshot(&a.pool).unwrap(), ledger.snapshot(&b.pool).unwrap());
    assert_eq!((sa.base_reserve, sa.quote_reserve), (sb.base_reserve, sb.quote_reserve));
    assert_eq!(
        ledger.balance(&a.trader, Asset::Base(a.mint)),
        ledger.balance(&b.trader, Asset::Base(b.mint))
    );
}

#[tokio::test(start_paused = true)]
async fn test_trading_stops_at_freeze() {
    let launch = Launch::seeded();
    let ledger = Arc::clone(&launch.ledger);
    let traders = traders(&ledger, 4);
    let (migrator, venue) = keeper(&ledger);

    let handles: Vec<_> = traders
        .into_iter()
        .map(|trader| {
            let ledger = Arc::clone(&ledger);
            let pool = launch.pool;
            thread::spawn(move || {
                let mut filled = 0u64;
                for _ in 0..200 {
                    match until_admitted(|| buy(&ledger, pool, trader, LAMPORTS_PER_SOL / 100)) {
                        Ok(fill) => filled += fill.amount_out,
                        Err(LaunchpadError::PoolLocked) => break,
                        Err(e) => panic!("unexpected swap error: {}", e),
                    }
                }
                (trader, filled)
            })
        })
        .collect();

    let outcome = migrator.migrate(launch.pool).await.unwrap();
    let fills: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Whatever traded before the freeze went out with the external pool
    let external = venue.pool(&outcome.external_pool).unwrap();
    let snapshot = ledger.snapshot(&launch.pool).unwrap();
    assert_eq!(snapshot.status, PoolStatus::Locked);
    let held: u64 = fills.iter().map(|(_, filled)| filled).sum();
    for (trader, filled) in &fills {
        assert_eq!(ledger.balance(trader, Asset::Base(launch.mint)), *filled);
    }
    assert_eq!(external.base_reserve + held, DEPOSIT_BASE);
}
