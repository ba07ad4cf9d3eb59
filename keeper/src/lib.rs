//! Launchpad migration keeper
//!
//! Watches launch pools and, once one is ready, moves its reserves to an
//! external market/AMM venue and burns the resulting liquidity receipts.

pub mod config;
pub mod orchestrator;
pub mod record;
pub mod retry;
pub mod venue;

pub use config::Config;
pub use orchestrator::{MigrationError, MigrationOutcome, MigrationSettings, Migrator};
pub use record::{MigrationRecord, MigrationStep};
pub use retry::{with_retry, RetryPolicy, Transient};
pub use venue::{DexVenue, ExternalPoolKeys, InMemoryVenue, MarketParams, PoolSeed, VenueError, VenueOp};
