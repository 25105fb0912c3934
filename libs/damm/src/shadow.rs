//! Aggregator-side bookkeeping for one registered pool

use crate::pool::Pool;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the aggregator remembers about a pool between synchronizations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolShadowState {
    pub name: String,

    /// Invariant root assigned at the last sync
    pub sqrt_k: Decimal,

    /// Pool actual balances as of the last sync
    pub x: Decimal,
    pub y: Decimal,

    /// Supply minted on behalf of this pool, never negative
    pub total_supply: Decimal,

    /// Ledger entry consumed by the last sync
    pub previous_sync_index: u64,

    /// Lowest ledger index the next sync may target
    pub next_min_sync_index: u64,

    /// Root delta contributed by the last sync
    pub previous_delta: Decimal,
}

impl PoolShadowState {
    /// Fresh state seeded from the pool's current actual balances
    pub fn register(pool: &Pool) -> Self {
        let (x, y) = pool.balances();
        Self {
            name: pool.name().to_string(),
            sqrt_k: Decimal::ZERO,
            x,
            y,
            total_supply: Decimal::ZERO,
            previous_sync_index: 0,
            next_min_sync_index: 0,
            previous_delta: Decimal::ZERO,
        }
    }
}
