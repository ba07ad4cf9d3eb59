//! Per-pool migration progress

use launchpad_amm::{MigrationHandoff, PoolSnapshot, PoolStatus};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::venue::ExternalPoolKeys;

/// Last completed migration step. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MigrationStep {
    Init,
    MarketCreated,
    PoolInitialized,
    Locked,
}

impl MigrationStep {
    pub fn next(self) -> Option<Self> {
        match self {
            MigrationStep::Init => Some(MigrationStep::MarketCreated),
            MigrationStep::MarketCreated => Some(MigrationStep::PoolInitialized),
            MigrationStep::PoolInitialized => Some(MigrationStep::Locked),
            MigrationStep::Locked => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move migration from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: MigrationStep,
    pub to: MigrationStep,
}

#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub pool: Pubkey,
    pub step: MigrationStep,
    /// Pool state frozen when trading was halted; seeds the external pool
    pub frozen: PoolSnapshot,
    pub market: Option<Pubkey>,
    pub keys: Option<ExternalPoolKeys>,
    /// What the ledger was told at the drain
    pub handoff: Option<MigrationHandoff>,
    /// Largest receipt balance observed before burning
    pub burned: u64,
}

impl MigrationRecord {
    pub fn new(frozen: PoolSnapshot) -> Self {
        Self {
            pool: frozen.key,
            step: MigrationStep::Init,
            frozen,
            market: None,
            keys: None,
            handoff: None,
            burned: 0,
        }
    }

    /// Rebuild progress for a pool another run already drained. Only the
    /// lock is left to do, and the ledger's handoff says where.
    pub fn drained(snapshot: PoolSnapshot) -> Option<Self> {
        let handoff = match (snapshot.status, snapshot.handoff) {
            (PoolStatus::Migrated, Some(handoff)) => handoff,
            _ => return None,
        };
        Some(Self {
            pool: snapshot.key,
            step: MigrationStep::PoolInitialized,
            market: Some(handoff.market),
            keys: None,
            handoff: Some(handoff),
            burned: 0,
            frozen: PoolSnapshot {
                base_reserve: handoff.base_amount,
                quote_reserve: handoff.quote_amount,
                ..snapshot
            },
        })
    }

    pub fn advance(&mut self, to: MigrationStep) -> Result<(), InvalidTransition> {
        if self.step.next() != Some(to) {
            return Err(InvalidTransition { from: self.step, to });
        }
        self.step = to;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.step == MigrationStep::Locked
    }
}
