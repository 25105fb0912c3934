//! # DAMM - Aggregated Constant-Product Pools
//!
//! ## Purpose
//!
//! Accounting engine for a set of constant-product pools that price against
//! virtual balances while an aggregator keeps one shared supply and invariant
//! ledger for all of them. Each pool mutates on its own (joins, exits, swaps);
//! synchronizing a pool folds its local invariant growth into the ledger and
//! resizes its virtual balances to the aggregate depth, subject to a solvency
//! floor on the global health factor.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Caller-driven pool operations and sync targets
//! - **Configuration**: Solvency limits and tolerances from `damm-config`
//! - **Precision**: `Decimal` arithmetic throughout, Newton square roots
//! - **Observability**: `tracing` events for every state change and rejected sync
//!
//! ## Architecture Role
//!
//! ```text
//! Pool (join / exit / buy_x / buy_y)
//!   │  &mut borrow per call
//!   ▼
//! Damm::synchronize ── stage (all checks) ── commit
//!   │                                           │
//!   ▼                                           ▼
//! PoolShadowState (per pool)            SyncLedger (append-only)
//! ```
//!
//! See [`architecture_diagram()`] for the sync data flow.
//!
//! ## Quick Start
//!
//! ```rust
//! use damm::{dec, Damm, Pool};
//!
//! let mut damm = Damm::new("DAMM");
//! let mut pool = Pool::with_defaults("AMM1");
//! damm.register_pool(&pool).unwrap();
//!
//! let minted = pool.join(dec!(100), dec!(100)).unwrap();
//! assert_eq!(minted, dec!(100));
//!
//! damm.sync(&mut pool, 0).unwrap();
//! assert_eq!(damm.total_supply(), dec!(100));
//! assert_eq!(damm.health_factor().unwrap(), dec!(1));
//! ```

pub mod aggregator;
pub mod error;
pub mod impermanent_loss;
pub mod math;
pub mod pool;
pub mod pool_traits;
pub mod shadow;
pub mod sync_point;

pub use aggregator::{Damm, SyncReport};
pub use error::{DammError, Result};
pub use math::CurveMath;
pub use pool::{transfer, transfer_all, Pool, SwapOutcome};
pub use pool_traits::{AmmPool, SwapDirection};
pub use shadow::PoolShadowState;
pub use sync_point::{SyncLedger, SyncPoint};

/// Common types for pool calculations
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;

/// Architecture diagram showing how a synchronization moves data
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// graph LR
///     subgraph Pool["🏊 Pool"]
///         VB[Virtual Balances]
///         AB[Actual Balances]
///     end
///
///     subgraph Stage["🧮 Stage"]
///         LR[Local Root]
///         NR[New Root]
///         HF[Health Check]
///     end
///
///     subgraph Aggregator["📒 Aggregator"]
///         SL[Sync Ledger]
///         SH[Shadow State]
///         GB[Global Balances]
///     end
///
///     VB --> LR
///     SL --> NR
///     SH --> NR
///     LR --> NR
///     AB --> GB
///     NR --> HF
///     GB --> HF
///
///     HF -->|commit| SL
///     HF -->|commit| SH
///     HF -->|commit| VB
///
///     style Pool fill:#e1f5fe
///     style Stage fill:#fff3e0
///     style Aggregator fill:#e8f5e9
/// ```
pub fn architecture_diagram() {
    // This function exists solely for documentation purposes
    // The diagram is rendered by aquamarine in rustdoc
}
