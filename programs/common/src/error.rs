//! Error taxonomy shared by the ledger, the swap engine and the liquidity manager

use thiserror::Error;

/// Coarse class of a rejection, deciding who should react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape. Never retried.
    Validation,
    /// Request would break a pool invariant. Caller resubmits with new parameters.
    InvariantViolation,
    /// Lost a race for the pool. Retried internally, surfaced only as `Busy`.
    StateConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchpadError {
    #[error("amm config already exists for this launch id")]
    DuplicateId,
    #[error("fee must be below 10000 bps, got {0}")]
    InvalidFee(u16),
    #[error("pool or authority key does not match (amm, mint) derivation")]
    InvalidMint,
    #[error("mint already launched")]
    MintAlreadyExists,
    #[error("unknown amm config")]
    UnknownAmm,
    #[error("unknown pool")]
    UnknownPool,
    #[error("pool already exists")]
    PoolExists,
    #[error("amount must be non-zero")]
    ZeroAmount,
    #[error("quote side must be {expected} for this deposit, got {actual}")]
    UnbalancedDeposit { expected: u64, actual: u64 },
    #[error("initial deposit must mint more than the withheld minimum liquidity")]
    InitialLiquidityTooSmall,
    #[error("holder owns {available} receipts, requested {requested}")]
    InsufficientReceipts { available: u64, requested: u64 },
    #[error("holder has {available}, needs {required}")]
    InsufficientFunds { available: u64, required: u64 },
    #[error("only the pool authority may mint or burn receipts")]
    Unauthorized,
    #[error("pool is locked for migration")]
    PoolLocked,
    #[error("pool is not in the expected migration state")]
    InvalidPoolStatus,
    #[error("quote reserve {quote_reserve} below migration threshold {threshold}")]
    LaunchIncomplete { quote_reserve: u64, threshold: u64 },
    #[error("output {actual} below requested minimum {minimum}")]
    SlippageExceeded { minimum: u64, actual: u64 },
    #[error("post-trade holding {holding} exceeds wallet cap {cap}")]
    WalletCapExceeded { holding: u64, cap: u64 },
    #[error("trade would empty a reserve")]
    LiquidityExhausted,
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("pool has no reserves")]
    PoolUninitialized,
    #[error("pool is busy, retry later")]
    Busy,
}

impl LaunchpadError {
    pub fn kind(&self) -> ErrorKind {
        use LaunchpadError::*;
        match self {
            SlippageExceeded { .. }
            | WalletCapExceeded { .. }
            | LiquidityExhausted
            | ArithmeticOverflow => ErrorKind::InvariantViolation,
            Busy => ErrorKind::StateConflict,
            _ => ErrorKind::Validation,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StateConflict
    }
}

pub type LaunchpadResult<T> = Result<T, LaunchpadError>;
