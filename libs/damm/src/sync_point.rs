//! Append-only ledger of cumulative invariant roots
//!
//! Each synchronization appends one [`SyncPoint`]. The difference between any
//! two points is the invariant growth contributed by all pools in between,
//! which is how a pool learns about the others without talking to them.

use crate::error::{DammError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncPoint {
    /// Position in the ledger, assigned at append time
    pub index: u64,
    /// Cumulative global invariant root up to and including this entry
    pub sqrt_k: Decimal,
}

impl SyncPoint {
    pub const GENESIS: SyncPoint = SyncPoint {
        index: 0,
        sqrt_k: Decimal::ZERO,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLedger {
    points: Vec<SyncPoint>,
}

impl SyncLedger {
    /// Ledger holding only the genesis entry
    pub fn new() -> Self {
        Self {
            points: vec![SyncPoint::GENESIS],
        }
    }

    pub fn get(&self, index: u64) -> Result<&SyncPoint> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.points.get(i))
            .ok_or_else(|| DammError::InvalidSyncPoint {
                requested: index,
                reason: format!("ledger has {} entries", self.points.len()),
            })
    }

    pub fn latest(&self) -> &SyncPoint {
        self.points.last().unwrap_or(&SyncPoint::GENESIS)
    }

    pub fn len(&self) -> u64 {
        self.points.len() as u64
    }

    /// Always false: genesis is present from construction
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The entry that `append(sqrt_k)` would create, without appending it
    pub fn next_point(&self, sqrt_k: Decimal) -> SyncPoint {
        SyncPoint {
            index: self.len(),
            sqrt_k,
        }
    }

    /// Append a new entry at index `len()`
    pub fn append(&mut self, sqrt_k: Decimal) -> SyncPoint {
        let point = self.next_point(sqrt_k);
        self.points.push(point);
        point
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncPoint> {
        self.points.iter()
    }
}

impl Default for SyncLedger {
    fn default() -> Self {
        Self::new()
    }
}
