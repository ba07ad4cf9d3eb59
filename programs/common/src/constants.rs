//! Launch constants

pub use solana_program::native_token::LAMPORTS_PER_SOL;

/// Basis points scale (10,000 bps = 100%)
pub const BPS_SCALE: u64 = 10_000;

/// Default pool fee, retained in the reserves (1%)
pub const DEFAULT_FEE_BPS: u16 = 100;

/// Treasury skim charged on top of every traded input (1%)
pub const TREASURY_FEE_BPS: u16 = 100;

/// Decimals of every launched base token
pub const TOKEN_DECIMALS: u8 = 6;

/// Supply minted to the creator when a base token is launched
pub const TOTAL_SUPPLY: u64 = 1_000_000_000 * 10u64.pow(TOKEN_DECIMALS as u32);

/// Receipts withheld from the first depositor and parked with the pool authority
pub const MINIMUM_LIQUIDITY: u64 = 100;

/// Default per-wallet cap on base holdings
pub const DEFAULT_MAX_PER_WALLET: u64 = 100_000_000 * LAMPORTS_PER_SOL;

/// Quote a launcher seeds a fresh pool with
pub const BOOTSTRAP_QUOTE: u64 = 24 * LAMPORTS_PER_SOL;
