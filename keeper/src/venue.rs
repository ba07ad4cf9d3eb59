//! External market/DEX venue the keeper migrates liquidity to
//!
//! The keeper only depends on [`DexVenue`]. [`InMemoryVenue`] is the
//! deterministic stand-in used for dry runs and tests: it derives pool keys
//! the way an AMM v4 style program does (from the market id), mints receipts
//! on pool initialization, and can be scripted to fail or to lose responses.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use launchpad_amm::math::isqrt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::retry::Transient;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    /// Timeouts, unconfirmed transactions, reads racing a write
    #[error("transient venue failure: {0}")]
    Transient(String),
    #[error("venue rejected request: {0}")]
    Rejected(String),
    #[error("unknown market {0}")]
    UnknownMarket(Pubkey),
}

impl Transient for VenueError {
    fn is_transient(&self) -> bool {
        matches!(self, VenueError::Transient(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Market account the caller picked; creating it twice is a no-op
    pub market: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
}

/// Accounts of the external pool associated with a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPoolKeys {
    pub id: Pubkey,
    pub market: Pubkey,
    pub authority: Pubkey,
    pub nonce: u8,
    pub lp_mint: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub open_orders: Pubkey,
    pub target_orders: Pubkey,
}

/// Pool initialization request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSeed {
    pub keys: ExternalPoolKeys,
    pub nonce: u8,
    pub open_time: u64,
    pub base_amount: u64,
    pub quote_amount: u64,
    /// Receives the external receipts
    pub owner: Pubkey,
}

#[async_trait]
pub trait DexVenue: Send + Sync {
    /// Create the owner's token account for a mint if it does not exist yet
    async fn ensure_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Result<(), VenueError>;

    /// Open `params.market`. Returns the market if it already exists with
    /// the same parameters.
    async fn create_market(&self, params: MarketParams) -> Result<Pubkey, VenueError>;

    /// Derive the external pool keys for a market. Fails transiently until
    /// the market is readable.
    async fn pool_keys(&self, market: &Pubkey) -> Result<ExternalPoolKeys, VenueError>;

    async fn is_pool_initialized(&self, pool: &Pubkey) -> Result<bool, VenueError>;

    async fn initialize_pool(&self, seed: PoolSeed) -> Result<(), VenueError>;

    async fn lp_balance(&self, lp_mint: &Pubkey, owner: &Pubkey) -> Result<u64, VenueError>;

    /// Destroy receipts. Irreversible.
    async fn burn(&self, lp_mint: &Pubkey, owner: &Pubkey, amount: u64) -> Result<(), VenueError>;
}

/// Operations that can be scripted to fail on [`InMemoryVenue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueOp {
    EnsureTokenAccount,
    CreateMarket,
    PoolKeys,
    InitializePool,
    LpBalance,
    Burn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalPool {
    pub keys: ExternalPoolKeys,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub lp_supply: u64,
}

#[derive(Debug, Default)]
struct VenueState {
    markets: HashMap<Pubkey, MarketParams>,
    market_count: u64,
    /// Reads a market still needs before it becomes visible
    pending_visibility: HashMap<Pubkey, u32>,
    pools: HashMap<Pubkey, ExternalPool>,
    lp_balances: HashMap<(Pubkey, Pubkey), u64>,
    token_accounts: HashSet<(Pubkey, Pubkey)>,
    /// Fail before doing anything
    failures: HashMap<VenueOp, u32>,
    /// Do the work, then report a transient failure
    lost_responses: HashMap<VenueOp, u32>,
    calls: HashMap<VenueOp, u32>,
}

impl VenueState {
    fn enter(&mut self, op: VenueOp) -> Result<(), VenueError> {
        *self.calls.entry(op).or_default() += 1;
        if take_one(&mut self.failures, op) {
            return Err(VenueError::Transient(format!("{:?} timed out", op)));
        }
        Ok(())
    }

    fn leave<T>(&mut self, op: VenueOp, value: T) -> Result<T, VenueError> {
        if take_one(&mut self.lost_responses, op) {
            return Err(VenueError::Transient(format!("{:?} confirmation lost", op)));
        }
        Ok(value)
    }
}

fn take_one(counts: &mut HashMap<VenueOp, u32>, op: VenueOp) -> bool {
    match counts.get_mut(&op) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

pub struct InMemoryVenue {
    amm_program: Pubkey,
    market_program: Pubkey,
    visibility_lag: u32,
    state: Mutex<VenueState>,
}

impl InMemoryVenue {
    pub fn new(amm_program: Pubkey, market_program: Pubkey) -> Self {
        Self {
            amm_program,
            market_program,
            visibility_lag: 0,
            state: Mutex::new(VenueState::default()),
        }
    }

    /// Newly created markets stay unreadable for `reads` key derivations
    pub fn with_visibility_lag(mut self, reads: u32) -> Self {
        self.visibility_lag = reads;
        self
    }

    /// Make the next `times` calls of `op` fail transiently without effect
    pub fn fail_next(&self, op: VenueOp, times: u32) {
        self.state.lock().failures.insert(op, times);
    }

    /// Make the next `times` calls of `op` take effect but report a transient failure
    pub fn lose_responses(&self, op: VenueOp, times: u32) {
        self.state.lock().lost_responses.insert(op, times);
    }

    pub fn calls(&self, op: VenueOp) -> u32 {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn market(&self, market: &Pubkey) -> Option<MarketParams> {
        self.state.lock().markets.get(market).copied()
    }

    pub fn market_count(&self) -> u64 {
        self.state.lock().market_count
    }

    pub fn pool(&self, id: &Pubkey) -> Option<ExternalPool> {
        self.state.lock().pools.get(id).copied()
    }

    pub fn has_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> bool {
        self.state.lock().token_accounts.contains(&(*owner, *mint))
    }

    fn derive_keys(&self, market: &Pubkey, params: &MarketParams) -> ExternalPoolKeys {
        let program = &self.amm_program;
        let associated = |seed: &[u8]| {
            Pubkey::find_program_address(&[program.as_ref(), market.as_ref(), seed], program).0
        };
        let (authority, nonce) = Pubkey::find_program_address(&[b"amm authority"], program);

        ExternalPoolKeys {
            id: associated(b"amm_associated_seed"),
            market: *market,
            authority,
            nonce,
            lp_mint: associated(b"lp_mint_associated_seed"),
            base_mint: params.base_mint,
            quote_mint: params.quote_mint,
            base_vault: associated(b"coin_vault_associated_seed"),
            quote_vault: associated(b"pc_vault_associated_seed"),
            open_orders: associated(b"open_order_associated_seed"),
            target_orders: associated(b"target_associated_seed"),
        }
    }
}

#[async_trait]
impl DexVenue for InMemoryVenue {
    async fn ensure_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Result<(), VenueError> {
        let mut state = self.state.lock();
        state.enter(VenueOp::EnsureTokenAccount)?;
        state.token_accounts.insert((*owner, *mint));
        state.leave(VenueOp::EnsureTokenAccount, ())
    }

    async fn create_market(&self, params: MarketParams) -> Result<Pubkey, VenueError> {
        let mut state = self.state.lock();
        state.enter(VenueOp::CreateMarket)?;
        if params.base_lot_size == 0 || params.quote_lot_size == 0 {
            return Err(VenueError::Rejected("lot sizes must be non-zero".to_string()));
        }

        let market = params.market;
        if let Some(existing) = state.markets.get(&market).copied() {
            if existing != params {
                return Err(VenueError::Rejected(format!("market {} already in use", market)));
            }
            log::debug!("Market {} already open on {}", market, self.market_program);
            return state.leave(VenueOp::CreateMarket, market);
        }

        state.market_count += 1;
        state.markets.insert(market, params);
        if self.visibility_lag > 0 {
            state.pending_visibility.insert(market, self.visibility_lag);
        }
        state.leave(VenueOp::CreateMarket, market)
    }

    async fn pool_keys(&self, market: &Pubkey) -> Result<ExternalPoolKeys, VenueError> {
        let mut state = self.state.lock();
        state.enter(VenueOp::PoolKeys)?;
        let params = *state.markets.get(market).ok_or(VenueError::UnknownMarket(*market))?;

        if let Some(remaining) = state.pending_visibility.get_mut(market) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(VenueError::Transient(format!("market {} not visible yet", market)));
            }
        }

        let keys = self.derive_keys(market, &params);
        state.leave(VenueOp::PoolKeys, keys)
    }

    async fn is_pool_initialized(&self, pool: &Pubkey) -> Result<bool, VenueError> {
        Ok(self.state.lock().pools.contains_key(pool))
    }

    async fn initialize_pool(&self, seed: PoolSeed) -> Result<(), VenueError> {
        let mut state = self.state.lock();
        state.enter(VenueOp::InitializePool)?;

        let params = *state
            .markets
            .get(&seed.keys.market)
            .ok_or(VenueError::UnknownMarket(seed.keys.market))?;
        if seed.keys != self.derive_keys(&seed.keys.market, &params) || seed.nonce != seed.keys.nonce {
            return Err(VenueError::Rejected("pool keys do not belong to market".to_string()));
        }
        if state.pools.contains_key(&seed.keys.id) {
            return Err(VenueError::Rejected("pool already initialized".to_string()));
        }
        if seed.base_amount == 0 || seed.quote_amount == 0 {
            return Err(VenueError::Rejected("pool needs both sides".to_string()));
        }
        if !state.token_accounts.contains(&(seed.owner, seed.keys.lp_mint)) {
            return Err(VenueError::Rejected("owner has no receipt account".to_string()));
        }

        let lp = u64::try_from(isqrt(seed.base_amount as u128 * seed.quote_amount as u128))
            .map_err(|_| VenueError::Rejected("receipt supply overflow".to_string()))?;
        state.pools.insert(
            seed.keys.id,
            ExternalPool {
                keys: seed.keys,
                base_reserve: seed.base_amount,
                quote_reserve: seed.quote_amount,
                lp_supply: lp,
            },
        );
        state.lp_balances.insert((seed.keys.lp_mint, seed.owner), lp);
        state.leave(VenueOp::InitializePool, ())
    }

    async fn lp_balance(&self, lp_mint: &Pubkey, owner: &Pubkey) -> Result<u64, VenueError> {
        let mut state = self.state.lock();
        state.enter(VenueOp::LpBalance)?;
        let balance = state.lp_balances.get(&(*lp_mint, *owner)).copied().unwrap_or(0);
        state.leave(VenueOp::LpBalance, balance)
    }

    async fn burn(&self, lp_mint: &Pubkey, owner: &Pubkey, amount: u64) -> Result<(), VenueError> {
        let mut state = self.state.lock();
        state.enter(VenueOp::Burn)?;

        let balance = state.lp_balances.get(&(*lp_mint, *owner)).copied().unwrap_or(0);
        if amount > balance {
            return Err(VenueError::Rejected(format!("burn {} exceeds balance {}", amount, balance)));
        }
        state.lp_balances.insert((*lp_mint, *owner), balance - amount);
        if let Some(pool) = state.pools.values_mut().find(|p| p.keys.lp_mint == *lp_mint) {
            pool.lp_supply -= amount;
        }
        state.leave(VenueOp::Burn, ())
    }
}
