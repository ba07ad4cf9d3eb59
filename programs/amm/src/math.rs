//! Constant product AMM math (x·y=k)
//!
//! All amounts are native-decimal `u64`. Products are widened to `u128` and
//! narrowed back only after a range check; nothing wraps.

use launchpad_common::{LaunchpadError, BPS_SCALE};

type Result<T> = core::result::Result<T, LaunchpadError>;

/// Price scaling factor (1e9)
pub const SCALE: u64 = 1_000_000_000;

/// Narrow a widened intermediate back to a native amount
#[inline]
pub fn narrow(x: u128) -> Result<u64> {
    u64::try_from(x).map_err(|_| LaunchpadError::ArithmeticOverflow)
}

#[inline]
pub fn checked_add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(LaunchpadError::ArithmeticOverflow)
}

#[inline]
pub fn checked_sub(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b).ok_or(LaunchpadError::ArithmeticOverflow)
}

/// floor(a * b / d). A zero divisor is always an empty reserve or supply.
pub fn mul_div_floor(a: u64, b: u64, d: u64) -> Result<u64> {
    if d == 0 {
        return Err(LaunchpadError::PoolUninitialized);
    }
    narrow(a as u128 * b as u128 / d as u128)
}

/// ceil(a * b / d)
pub fn mul_div_ceil(a: u64, b: u64, d: u64) -> Result<u64> {
    if d == 0 {
        return Err(LaunchpadError::PoolUninitialized);
    }
    let n = a as u128 * b as u128;
    let d = d as u128;
    narrow(n.div_ceil(d))
}

/// Fee on an amount, truncated: amount * bps / 10_000
pub fn fee_amount(amount: u64, fee_bps: u16) -> Result<u64> {
    mul_div_floor(amount, fee_bps as u64, BPS_SCALE)
}

/// Integer square root, floor(sqrt(n))
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    // Newton from an overestimate converges monotonically downward
    let mut x = 1u128 << ((128 - n.leading_zeros()).div_ceil(2));
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// k = x·y, widened
#[inline]
pub fn invariant(x: u64, y: u64) -> u128 {
    x as u128 * y as u128
}

/// Spot price of base in quote, scaled by SCALE
pub fn spot_price(base_reserve: u64, quote_reserve: u64) -> Result<u64> {
    mul_div_floor(quote_reserve, SCALE, base_reserve)
}

/// Result of pricing a swap against a reserve pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveQuote {
    /// Gross amount the pool receives
    pub amount_in: u64,

    /// Pool fee retained in the input reserve
    pub pool_fee: u64,

    /// Amount the curve prices (amount_in - pool_fee)
    pub net_in: u64,

    /// Amount the pool pays out
    pub amount_out: u64,

    /// Input reserve after the trade
    pub new_reserve_in: u64,

    /// Output reserve after the trade
    pub new_reserve_out: u64,
}

/// Price an exact-input swap
///
/// With fee on input:
/// - Δin_net = Δin · (1 - fee)
/// - Δout = y · Δin_net / (x + Δin_net), floored
/// - x1 = x + Δin (the fee stays in the pool)
/// - y1 = y - Δout
///
/// Flooring Δout is the same as rounding y1 up to ceil(k / (x + Δin_net)),
/// so x1·y1 ≥ k holds for every input.
pub fn quote_exact_in(
    reserve_in: u64,
    reserve_out: u64,
    fee_bps: u16,
    amount_in: u64,
) -> Result<CurveQuote> {
    if amount_in == 0 {
        return Err(LaunchpadError::ZeroAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(LaunchpadError::PoolUninitialized);
    }

    let pool_fee = fee_amount(amount_in, fee_bps)?;
    let net_in = checked_sub(amount_in, pool_fee)?;

    let x = reserve_in as u128;
    let y = reserve_out as u128;
    let dx = net_in as u128;

    let amount_out = narrow(y * dx / (x + dx))?;
    if amount_out == 0 {
        return Err(LaunchpadError::ZeroAmount);
    }
    // Unreachable while Δout is floored below y; kept so a pricing change
    // can never hand out a whole reserve
    if amount_out >= reserve_out {
        return Err(LaunchpadError::LiquidityExhausted);
    }

    Ok(CurveQuote {
        amount_in,
        pool_fee,
        net_in,
        amount_out,
        new_reserve_in: checked_add(reserve_in, amount_in)?,
        new_reserve_out: reserve_out - amount_out,
    })
}

/// Receipts for the bootstrap deposit: floor(sqrt(base · quote))
pub fn initial_receipts(amount_base: u64, amount_quote: u64) -> Result<u64> {
    narrow(isqrt(amount_base as u128 * amount_quote as u128))
}
