//! Launchpad migration keeper
//!
//! Runs one launch end to end against the in-memory venue: the creator seeds
//! a pool, a few buyers push the quote reserve past the migration threshold,
//! then the pool is migrated and its external liquidity burned.
//!
//! `launchpad-keeper --write-config <path>` writes the default configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use launchpad_amm::{CreateAmmRequest, CreatePoolRequest, DepositRequest, Ledger, SwapRequest};
use launchpad_common::{Asset, Direction, BOOTSTRAP_QUOTE, LAMPORTS_PER_SOL, TOTAL_SUPPLY};
use launchpad_keeper::{Config, InMemoryVenue, MigrationSettings, Migrator};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

/// Share of the supply the creator puts in the pool
const POOL_BASE: u64 = TOTAL_SUPPLY / 10 * 8;

const BUYERS: usize = 3;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if let [_, flag, path] = args.as_slice() {
        if flag == "--write-config" {
            return Config::write_default(path);
        }
    }

    log::info!("Starting launchpad keeper (dry run)");

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({}), using local defaults", e);
        Config::default_local()
    });
    config.validate()?;

    log::info!("Launch program: {}", config.program_id);
    log::info!("Migrating to amm {} via market program {}", config.amm_program, config.market_program);

    let ledger = Arc::new(Ledger::new(config.program_id, config.treasury));
    let pool = run_launch(&ledger, &config)?;

    let venue = Arc::new(InMemoryVenue::new(config.amm_program, config.market_program));
    let migrator = Migrator::new(Arc::clone(&ledger), venue, MigrationSettings::from(&config));

    let outcome = migrator.migrate(pool).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    log::info!(
        "Treasury collected {} lamports",
        ledger.balance(&config.treasury, Asset::Quote)
    );
    Ok(())
}

/// Create, seed and trade one launch until it can migrate
fn run_launch(ledger: &Ledger, config: &Config) -> Result<Pubkey> {
    let creator = Keypair::new();
    let mint = Keypair::new();
    log::info!("Creator {} launching mint {}", creator.pubkey(), mint.pubkey());

    let amm = ledger.create_amm(CreateAmmRequest {
        launch_id: Keypair::new().pubkey(),
        fee_bps: config.launch.fee_bps,
        max_per_wallet: config.launch.max_per_wallet,
        admin: creator.pubkey(),
    })?;
    ledger.mint_launch_supply(mint.pubkey(), creator.pubkey())?;
    ledger.fund_quote(creator.pubkey(), BOOTSTRAP_QUOTE)?;

    let addrs = ledger.pool_addresses(&amm, &mint.pubkey());
    let pool = ledger.create_pool(CreatePoolRequest {
        amm,
        base_mint: mint.pubkey(),
        pool: addrs.pool,
        authority: addrs.authority,
    })?;
    let seeded = ledger.deposit(DepositRequest {
        pool,
        amount_base: POOL_BASE,
        amount_quote: BOOTSTRAP_QUOTE,
        depositor: creator.pubkey(),
    })?;
    log::info!("Pool {} seeded, {} receipts minted", pool, seeded.receipts_minted);

    // Enough buying to clear the threshold with fees on top
    let needed = config
        .migration_quote_threshold
        .saturating_sub(BOOTSTRAP_QUOTE)
        .max(LAMPORTS_PER_SOL);
    let per_buyer = needed / BUYERS as u64 + LAMPORTS_PER_SOL;

    for _ in 0..BUYERS {
        let buyer = Keypair::new();
        ledger.fund_quote(buyer.pubkey(), per_buyer * 2)?;

        let quote = ledger.quote(&pool, Direction::QuoteToBase, per_buyer)?;
        let fill = ledger
            .swap_exact_in(SwapRequest {
                pool,
                direction: Direction::QuoteToBase,
                amount_in: per_buyer,
                min_amount_out: quote.amount_out,
                trader: buyer.pubkey(),
            })
            .with_context(|| format!("buy for {} failed", buyer.pubkey()))?;
        log::info!("{} bought {} base for {} lamports", buyer.pubkey(), fill.amount_out, fill.total_debited);
    }

    let snapshot = ledger.snapshot(&pool)?;
    log::info!(
        "Pool {} ready: base={} quote={} price={}",
        pool,
        snapshot.base_reserve,
        snapshot.quote_reserve,
        ledger.quote(&pool, Direction::QuoteToBase, LAMPORTS_PER_SOL)?.spot_price
    );
    Ok(pool)
}
