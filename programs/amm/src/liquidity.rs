//! Liquidity manager - deposits, withdrawals and receipt bookkeeping
//!
//! Receipts can only be minted with the pool's derived authority as signer,
//! and only from inside a ledger transaction, so no receipt exists that the
//! reserves did not pay for.
//!
//! The first deposit mints floor(sqrt(base · quote)) receipts and parks
//! `MINIMUM_LIQUIDITY` of them with the authority for good; later deposits
//! are pro-rata and must bring both sides in the current reserve ratio.

use launchpad_common::{Asset, LaunchpadError, Pubkey, MINIMUM_LIQUIDITY};

use crate::book::Posting;
use crate::ledger::Ledger;
use crate::math;
use crate::state::Pool;

type Result<T> = core::result::Result<T, LaunchpadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    pub pool: Pubkey,
    pub amount_base: u64,
    pub amount_quote: u64,
    pub depositor: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositOutcome {
    pub receipts_minted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub pool: Pubkey,
    pub receipts: u64,
    pub holder: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawOutcome {
    pub amount_base: u64,
    pub amount_quote: u64,
}

impl Pool {
    /// Mint receipts to `holder`. `signer` must be the pool authority.
    pub(crate) fn mint_receipts(&mut self, signer: &Pubkey, holder: Pubkey, amount: u64) -> Result<()> {
        if *signer != self.authority {
            return Err(LaunchpadError::Unauthorized);
        }
        let supply = math::checked_add(self.receipt_supply, amount)?;
        // A holder's balance never exceeds the supply, so this cannot overflow once the supply didn't
        let balance = self.receipts_of(&holder) + amount;
        self.receipt_supply = supply;
        self.receipts.insert(holder, balance);
        Ok(())
    }

    pub(crate) fn burn_receipts(&mut self, holder: &Pubkey, amount: u64) -> Result<()> {
        let available = self.receipts_of(holder);
        if available < amount {
            return Err(LaunchpadError::InsufficientReceipts { available, requested: amount });
        }
        self.receipts.insert(*holder, available - amount);
        self.receipt_supply -= amount;
        Ok(())
    }

    /// Sum of every holder's receipts equals the recorded supply
    pub fn receipts_conserved(&self) -> bool {
        let sum: u128 = self.receipt_holders().map(|(_, amount)| *amount as u128).sum();
        sum == self.receipt_supply as u128
    }

    /// Receipts a deposit would mint, split into (to depositor, withheld)
    fn plan_deposit(&self, amount_base: u64, amount_quote: u64) -> Result<(u64, u64)> {
        if amount_base == 0 || amount_quote == 0 {
            return Err(LaunchpadError::ZeroAmount);
        }

        if self.receipt_supply == 0 {
            let receipts = math::initial_receipts(amount_base, amount_quote)?;
            if receipts <= MINIMUM_LIQUIDITY {
                return Err(LaunchpadError::InitialLiquidityTooSmall);
            }
            return Ok((receipts - MINIMUM_LIQUIDITY, MINIMUM_LIQUIDITY));
        }

        let expected = self.matching_quote(amount_base)?;
        if amount_quote != expected {
            return Err(LaunchpadError::UnbalancedDeposit { expected, actual: amount_quote });
        }

        let receipts = math::mul_div_floor(self.receipt_supply, amount_base, self.base_reserve)?;
        if receipts == 0 {
            return Err(LaunchpadError::ZeroAmount);
        }
        Ok((receipts, 0))
    }

    /// Quote that must accompany `amount_base` in a follow-up deposit, rounded up
    pub fn matching_quote(&self, amount_base: u64) -> Result<u64> {
        math::mul_div_ceil(amount_base, self.quote_reserve, self.base_reserve)
    }
}

impl Ledger {
    /// Quote a follow-up deposit of `amount_base` must bring
    pub fn deposit_quote_for(&self, pool: &Pubkey, amount_base: u64) -> Result<u64> {
        self.transact(pool, |_, pool, _| pool.matching_quote(amount_base))
    }

    pub fn deposit(&self, req: DepositRequest) -> Result<DepositOutcome> {
        self.transact(&req.pool, |_, pool, book| {
            pool.ensure_trading()?;
            if req.depositor == pool.authority {
                return Err(LaunchpadError::Unauthorized);
            }

            let (minted, withheld) = pool.plan_deposit(req.amount_base, req.amount_quote)?;
            math::checked_add(pool.receipt_supply, minted + withheld)?;
            let base_reserve = math::checked_add(pool.base_reserve, req.amount_base)?;
            let quote_reserve = math::checked_add(pool.quote_reserve, req.amount_quote)?;

            book.apply(&[
                Posting::debit(req.depositor, Asset::Base(pool.base_mint), req.amount_base),
                Posting::debit(req.depositor, Asset::Quote, req.amount_quote),
            ])?;

            let authority = pool.authority;
            if withheld > 0 {
                pool.mint_receipts(&authority, authority, withheld)?;
            }
            pool.mint_receipts(&authority, req.depositor, minted)?;
            pool.base_reserve = base_reserve;
            pool.quote_reserve = quote_reserve;
            pool.bump();

            log::info!(
                "Deposit into {}: base={} quote={} receipts={} (withheld {})",
                pool.key,
                req.amount_base,
                req.amount_quote,
                minted,
                withheld
            );
            Ok(DepositOutcome { receipts_minted: minted })
        })
    }

    pub fn withdraw(&self, req: WithdrawRequest) -> Result<WithdrawOutcome> {
        if req.receipts == 0 {
            return Err(LaunchpadError::ZeroAmount);
        }

        self.transact(&req.pool, |_, pool, book| {
            pool.ensure_trading()?;
            if req.holder == pool.authority {
                return Err(LaunchpadError::Unauthorized);
            }

            let available = pool.receipts_of(&req.holder);
            if available < req.receipts {
                return Err(LaunchpadError::InsufficientReceipts {
                    available,
                    requested: req.receipts,
                });
            }

            let amount_base = math::mul_div_floor(req.receipts, pool.base_reserve, pool.receipt_supply)?;
            let amount_quote = math::mul_div_floor(req.receipts, pool.quote_reserve, pool.receipt_supply)?;
            if amount_base == 0 && amount_quote == 0 {
                return Err(LaunchpadError::ZeroAmount);
            }

            book.apply(&[
                Posting::credit(req.holder, Asset::Base(pool.base_mint), amount_base),
                Posting::credit(req.holder, Asset::Quote, amount_quote),
            ])?;

            pool.burn_receipts(&req.holder, req.receipts)?;
            pool.base_reserve -= amount_base;
            pool.quote_reserve -= amount_quote;
            pool.bump();

            log::info!(
                "Withdraw from {}: receipts={} base={} quote={}",
                pool.key,
                req.receipts,
                amount_base,
                amount_quote
            );
            Ok(WithdrawOutcome { amount_base, amount_quote })
        })
    }
}
