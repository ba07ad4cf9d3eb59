//! Swap engine - exact-input trades against a pool
//!
//! A trade pays twice on the input side:
//! - the pool fee (`AmmConfig::fee_bps`) stays in the input reserve and is
//!   not priced by the curve, so k grows with every swap;
//! - the treasury skim (`TREASURY_FEE_BPS`) is charged on top of the input
//!   and credited to the ledger's treasury, outside the pool.
//!
//! `min_amount_out` is always in units of the asset the trader receives.

use launchpad_common::{Asset, Direction, LaunchpadError, Pubkey, TREASURY_FEE_BPS};

use crate::book::Posting;
use crate::ledger::Ledger;
use crate::math::{self, CurveQuote};
use crate::state::{AmmConfig, Pool};

type Result<T> = core::result::Result<T, LaunchpadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub pool: Pubkey,
    pub direction: Direction,
    pub amount_in: u64,
    pub min_amount_out: u64,
    pub trader: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount_out: u64,

    /// Treasury skim charged on top of `amount_in`
    pub fee_charged: u64,

    /// Part of `amount_in` retained by the pool as its fee
    pub pool_fee: u64,

    /// Everything taken from the trader: `amount_in + fee_charged`
    pub total_debited: u64,
}

/// Read-only preview of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub amount_out: u64,
    pub pool_fee: u64,
    pub treasury_fee: u64,
    pub total_cost: u64,
    /// Spot price before the trade, base in quote scaled by `math::SCALE`
    pub spot_price: u64,
}

fn price(config: &AmmConfig, pool: &Pool, direction: Direction, amount_in: u64) -> Result<(CurveQuote, u64)> {
    let (reserve_in, reserve_out) = pool.reserves_for(direction.input_is_base());
    let curve = math::quote_exact_in(reserve_in, reserve_out, config.fee_bps, amount_in)?;
    let treasury_fee = math::fee_amount(amount_in, TREASURY_FEE_BPS)?;
    Ok((curve, treasury_fee))
}

impl Ledger {
    /// Price a swap without executing it
    pub fn quote(&self, pool: &Pubkey, direction: Direction, amount_in: u64) -> Result<SwapQuote> {
        self.transact(pool, |config, pool, _| {
            let (curve, treasury_fee) = price(config, pool, direction, amount_in)?;
            Ok(SwapQuote {
                amount_out: curve.amount_out,
                pool_fee: curve.pool_fee,
                treasury_fee,
                total_cost: math::checked_add(amount_in, treasury_fee)?,
                spot_price: pool.spot_price()?,
            })
        })
    }

    /// Execute an exact-input swap. Either every balance and reserve moves, or none do.
    pub fn swap_exact_in(&self, req: SwapRequest) -> Result<SwapOutcome> {
        if req.amount_in == 0 {
            return Err(LaunchpadError::ZeroAmount);
        }

        self.transact(&req.pool, |config, pool, book| {
            pool.ensure_trading()?;

            let (curve, treasury_fee) = price(config, pool, req.direction, req.amount_in)?;

            if curve.amount_out < req.min_amount_out {
                return Err(LaunchpadError::SlippageExceeded {
                    minimum: req.min_amount_out,
                    actual: curve.amount_out,
                });
            }

            let asset_in = Asset::input_of(req.direction, pool.base_mint);
            let asset_out = Asset::output_of(req.direction, pool.base_mint);

            if let Asset::Base(_) = asset_out {
                let holding = math::checked_add(book.balance(&req.trader, asset_out), curve.amount_out)?;
                if holding > config.max_per_wallet {
                    return Err(LaunchpadError::WalletCapExceeded {
                        holding,
                        cap: config.max_per_wallet,
                    });
                }
            }

            let total_debited = math::checked_add(req.amount_in, treasury_fee)?;
            book.apply(&[
                Posting::debit(req.trader, asset_in, total_debited),
                Posting::credit(self.treasury(), asset_in, treasury_fee),
                Posting::credit(req.trader, asset_out, curve.amount_out),
            ])?;

            if req.direction.input_is_base() {
                pool.base_reserve = curve.new_reserve_in;
                pool.quote_reserve = curve.new_reserve_out;
            } else {
                pool.quote_reserve = curve.new_reserve_in;
                pool.base_reserve = curve.new_reserve_out;
            }
            pool.bump();

            log::debug!(
                "Swap on {}: {:?} in={} out={} pool_fee={} treasury_fee={}",
                pool.key,
                req.direction,
                req.amount_in,
                curve.amount_out,
                curve.pool_fee,
                treasury_fee
            );

            Ok(SwapOutcome {
                amount_out: curve.amount_out,
                fee_charged: treasury_fee,
                pool_fee: curve.pool_fee,
                total_debited,
            })
        })
    }
}
