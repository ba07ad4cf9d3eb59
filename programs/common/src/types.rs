//! Core value types

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Side of a swap, named by what the trader gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Sell base, receive quote
    BaseToQuote,
    /// Buy base with quote
    QuoteToBase,
}

impl Direction {
    pub fn input_is_base(self) -> bool {
        matches!(self, Direction::BaseToQuote)
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::BaseToQuote => Direction::QuoteToBase,
            Direction::QuoteToBase => Direction::BaseToQuote,
        }
    }
}

/// Something a holder can have a balance of.
///
/// The quote asset is implicit and shared by every launch; base assets are
/// identified by their mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Quote,
    Base(Pubkey),
}

impl Asset {
    /// Asset a trader pays in for the given direction on a pool of `base_mint`
    pub fn input_of(direction: Direction, base_mint: Pubkey) -> Self {
        if direction.input_is_base() {
            Asset::Base(base_mint)
        } else {
            Asset::Quote
        }
    }

    /// Asset a trader receives for the given direction on a pool of `base_mint`
    pub fn output_of(direction: Direction, base_mint: Pubkey) -> Self {
        Self::input_of(direction.reverse(), base_mint)
    }
}
