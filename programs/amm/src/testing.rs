//! Launch fixtures shared by unit and integration tests

use std::sync::Arc;

use launchpad_common::{
    Pubkey, BOOTSTRAP_QUOTE, DEFAULT_FEE_BPS, DEFAULT_MAX_PER_WALLET, LAMPORTS_PER_SOL,
};

use crate::ledger::{CreateAmmRequest, CreatePoolRequest, Ledger};
use crate::liquidity::DepositRequest;

/// Base the admin seeds a launch pool with (800M of the 1B supply)
pub const DEPOSIT_BASE: u64 = 800_000_000 * 1_000_000;

/// Quote every fixture trader starts with
pub const TRADER_QUOTE: u64 = 100 * LAMPORTS_PER_SOL;

/// One launched token with its amm and pool, admin holding the supply
pub struct Launch {
    pub ledger: Arc<Ledger>,
    pub amm: Pubkey,
    pub mint: Pubkey,
    pub pool: Pubkey,
    pub authority: Pubkey,
    pub admin: Pubkey,
    pub trader: Pubkey,
}

impl Launch {
    /// Fresh ledger, empty pool
    pub fn new() -> Self {
        Self::on(Arc::new(Ledger::new(Pubkey::new_unique(), Pubkey::new_unique())))
    }

    /// Empty pool on an existing ledger
    pub fn on(ledger: Arc<Ledger>) -> Self {
        Self::build(ledger, DEFAULT_MAX_PER_WALLET)
    }

    /// Pool seeded with `DEPOSIT_BASE` and `BOOTSTRAP_QUOTE`
    pub fn seeded() -> Self {
        Self::seeded_with_cap(DEFAULT_MAX_PER_WALLET)
    }

    pub fn seeded_with_cap(max_per_wallet: u64) -> Self {
        let ledger = Arc::new(Ledger::new(Pubkey::new_unique(), Pubkey::new_unique()));
        let launch = Self::build(ledger, max_per_wallet);
        launch.seed();
        launch
    }

    /// Seed an empty fixture pool with the launch deposit
    pub fn seed(&self) {
        self.ledger
            .deposit(DepositRequest {
                pool: self.pool,
                amount_base: DEPOSIT_BASE,
                amount_quote: BOOTSTRAP_QUOTE,
                depositor: self.admin,
            })
            .expect("seed deposit");
    }

    fn build(ledger: Arc<Ledger>, max_per_wallet: u64) -> Self {
        let admin = Pubkey::new_unique();
        let trader = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let amm = ledger
            .create_amm(CreateAmmRequest {
                launch_id: Pubkey::new_unique(),
                fee_bps: DEFAULT_FEE_BPS,
                max_per_wallet,
                admin,
            })
            .expect("create amm");
        ledger.mint_launch_supply(mint, admin).expect("mint supply");
        ledger
            .fund_quote(admin, BOOTSTRAP_QUOTE + 10 * LAMPORTS_PER_SOL)
            .expect("fund admin");
        ledger.fund_quote(trader, TRADER_QUOTE).expect("fund trader");

        let addrs = ledger.pool_addresses(&amm, &mint);
        let pool = ledger
            .create_pool(CreatePoolRequest {
                amm,
                base_mint: mint,
                pool: addrs.pool,
                authority: addrs.authority,
            })
            .expect("create pool");

        Self {
            ledger,
            amm,
            mint,
            pool,
            authority: addrs.authority,
            admin,
            trader,
        }
    }
}

impl Default for Launch {
    fn default() -> Self {
        Self::new()
    }
}
