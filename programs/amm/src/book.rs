//! Token balance book - what every holder owns outside the pools
//!
//! Pools keep their own reserves; the book tracks traders, depositors and the
//! treasury. Postings are applied as a batch: every line is checked against a
//! scratch copy first, and the book only changes if all of them succeed.

use std::collections::{HashMap, HashSet};

use launchpad_common::{Asset, LaunchpadError, Pubkey};

/// One line of a balance movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posting {
    Debit { holder: Pubkey, asset: Asset, amount: u64 },
    Credit { holder: Pubkey, asset: Asset, amount: u64 },
}

impl Posting {
    pub fn debit(holder: Pubkey, asset: Asset, amount: u64) -> Self {
        Posting::Debit { holder, asset, amount }
    }

    pub fn credit(holder: Pubkey, asset: Asset, amount: u64) -> Self {
        Posting::Credit { holder, asset, amount }
    }
}

#[derive(Debug, Default)]
pub struct TokenBook {
    balances: HashMap<(Pubkey, Asset), u64>,
    launched: HashSet<Pubkey>,
}

impl TokenBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, holder: &Pubkey, asset: Asset) -> u64 {
        self.balances.get(&(*holder, asset)).copied().unwrap_or(0)
    }

    pub fn is_launched(&self, mint: &Pubkey) -> bool {
        self.launched.contains(mint)
    }

    /// Mint the whole supply of a new base token to its creator. Once per mint.
    pub fn launch(&mut self, mint: Pubkey, creator: Pubkey, supply: u64) -> Result<(), LaunchpadError> {
        if self.launched.contains(&mint) {
            return Err(LaunchpadError::MintAlreadyExists);
        }
        self.apply(&[Posting::credit(creator, Asset::Base(mint), supply)])?;
        self.launched.insert(mint);
        Ok(())
    }

    /// Apply a batch atomically
    pub fn apply(&mut self, postings: &[Posting]) -> Result<(), LaunchpadError> {
        let planned = self.plan(postings)?;
        self.balances.extend(planned);
        Ok(())
    }

    fn plan(&self, postings: &[Posting]) -> Result<HashMap<(Pubkey, Asset), u64>, LaunchpadError> {
        let mut scratch: HashMap<(Pubkey, Asset), u64> = HashMap::new();

        for posting in postings {
            let (key, next) = match *posting {
                Posting::Debit { holder, asset, amount } => {
                    let key = (holder, asset);
                    let current = scratch.get(&key).copied().unwrap_or_else(|| self.balance(&holder, asset));
                    let next = current.checked_sub(amount).ok_or(LaunchpadError::InsufficientFunds {
                        available: current,
                        required: amount,
                    })?;
                    (key, next)
                }
                Posting::Credit { holder, asset, amount } => {
                    let key = (holder, asset);
                    let current = scratch.get(&key).copied().unwrap_or_else(|| self.balance(&holder, asset));
                    let next = current.checked_add(amount).ok_or(LaunchpadError::ArithmeticOverflow)?;
                    (key, next)
                }
            };
            scratch.insert(key, next);
        }

        Ok(scratch)
    }

    /// Sum of all holders' balances of one asset
    pub fn total(&self, asset: Asset) -> u128 {
        self.balances
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .map(|(_, amount)| *amount as u128)
            .sum()
    }
}
