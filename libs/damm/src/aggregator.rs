//! DAMM aggregator: one supply and invariant ledger shared by many pools
//!
//! Pools mutate independently. [`Damm::synchronize`] folds one pool's local
//! invariant growth into the shared ledger, picks up the growth every other
//! pool recorded since this pool last synced, and resizes the pool's virtual
//! balances to the resulting global depth at an unchanged price.
//!
//! A synchronization is staged in full before anything is written, so a
//! rejected call leaves the ledger, shadow states, global balances and the
//! pool exactly as they were.

use crate::error::{DammError, Result};
use crate::math::CurveMath;
use crate::pool::Pool;
use crate::shadow::PoolShadowState;
use crate::sync_point::{SyncLedger, SyncPoint};
use damm_config::{DammConfig, SolvencySettings, ToleranceSettings};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Outcome of a committed synchronization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub pool: String,
    /// Root the pool's virtual balances were resized to
    pub new_root: Decimal,
    /// Root growth attributed to the pool since its previous sync
    pub local_delta: Decimal,
    /// Ledger entry appended by this sync
    pub sync_point: SyncPoint,
    /// `None` while global supply is zero
    pub health_factor: Option<Decimal>,
}

/// Everything a synchronization writes, computed before any of it is applied
#[derive(Debug)]
struct StagedSync {
    virtual_balances: (Decimal, Decimal),
    global_balances: (Decimal, Decimal),
    total_supply: Decimal,
    sync_point: SyncPoint,
    shadow: PoolShadowState,
    report: SyncReport,
}

#[derive(Debug, Clone)]
pub struct Damm {
    name: String,

    // Global actual balances
    x: Decimal,
    y: Decimal,

    total_supply: Decimal,

    ledger: SyncLedger,
    pools: HashMap<String, PoolShadowState>,

    solvency: SolvencySettings,
    tolerances: ToleranceSettings,
}

impl Damm {
    /// Aggregator with default solvency limits and tolerances
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, SolvencySettings::default(), ToleranceSettings::default())
    }

    pub fn with_settings(
        name: impl Into<String>,
        solvency: SolvencySettings,
        tolerances: ToleranceSettings,
    ) -> Self {
        Self {
            name: name.into(),
            x: Decimal::ZERO,
            y: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            ledger: SyncLedger::new(),
            pools: HashMap::new(),
            solvency,
            tolerances,
        }
    }

    pub fn from_config(name: impl Into<String>, config: &DammConfig) -> Self {
        Self::with_settings(name, config.solvency.clone(), config.tolerances.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Global actual balances `(X, Y)`
    pub fn balances(&self) -> (Decimal, Decimal) {
        (self.x, self.y)
    }

    pub fn total_supply(&self) -> Decimal {
        self.total_supply
    }

    pub fn ledger(&self) -> &SyncLedger {
        &self.ledger
    }

    pub fn solvency(&self) -> &SolvencySettings {
        &self.solvency
    }

    pub fn tolerances(&self) -> &ToleranceSettings {
        &self.tolerances
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolShadowState> {
        self.pools.values()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.pools.contains_key(name)
    }

    /// Start tracking a pool, seeded from its current actual balances
    pub fn register_pool(&mut self, pool: &Pool) -> Result<()> {
        match self.pools.entry(pool.name().to_string()) {
            Entry::Occupied(_) => Err(DammError::DuplicateName(pool.name().to_string())),
            Entry::Vacant(slot) => {
                let shadow = slot.insert(PoolShadowState::register(pool));
                info!(damm = %self.name, pool = %shadow.name, x = %shadow.x, y = %shadow.y, "Registered pool");
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&PoolShadowState> {
        self.pools
            .get(name)
            .ok_or_else(|| DammError::NotFound(name.to_string()))
    }

    /// Synchronize without an out-of-band transfer
    pub fn sync(&mut self, pool: &mut Pool, target_index: u64) -> Result<SyncReport> {
        self.synchronize(pool, target_index, Decimal::ZERO, Decimal::ZERO)
    }

    /// Reconcile `pool` against the ledger entry at `target_index`.
    ///
    /// `extra_x` / `extra_y` are added to the global balances after the pool's
    /// own delta, without being attributed to any pool.
    pub fn synchronize(
        &mut self,
        pool: &mut Pool,
        target_index: u64,
        extra_x: Decimal,
        extra_y: Decimal,
    ) -> Result<SyncReport> {
        match self.stage(pool, target_index, extra_x, extra_y) {
            Ok(staged) => Ok(self.commit(pool, staged)),
            Err(err) => {
                warn!(damm = %self.name, pool = %pool.name(), target_index, error = %err, "Synchronization rejected");
                Err(err)
            }
        }
    }

    fn stage(
        &self,
        pool: &Pool,
        target_index: u64,
        extra_x: Decimal,
        extra_y: Decimal,
    ) -> Result<StagedSync> {
        let shadow = self.lookup(pool.name())?;

        if target_index < shadow.next_min_sync_index {
            return Err(DammError::InvalidSyncPoint {
                requested: target_index,
                reason: format!("below floor {}", shadow.next_min_sync_index),
            });
        }
        let target = self.ledger.get(target_index)?;
        let base = self.ledger.get(shadow.previous_sync_index)?;

        if !pool.has_liquidity() {
            return Err(DammError::EmptyPool(pool.name().to_string()));
        }

        let health_before = self.health_factor_of(self.x, self.y, self.total_supply)?;

        // The pool's own invariant root
        let local_root = CurveMath::sqrt(pool.k()?)?;

        // Fold in what other pools added between the two checkpoints, minus what
        // this pool already contributed at its previous sync
        let others_growth = CurveMath::sub(target.sqrt_k, base.sqrt_k, "ledger growth")?;
        let new_root = CurveMath::sub(
            CurveMath::add(local_root, others_growth, "new root")?,
            shadow.previous_delta,
            "new root",
        )?;
        if new_root < Decimal::ZERO {
            return Err(DammError::InvariantViolation {
                detail: format!("new root {} is negative", new_root),
            });
        }

        let local_delta = CurveMath::sub(local_root, shadow.sqrt_k, "local delta")?;

        debug!(
            pool = %pool.name(),
            target_index,
            %local_root,
            target_root = %target.sqrt_k,
            base_root = %base.sqrt_k,
            previous_delta = %shadow.previous_delta,
            %new_root,
            %local_delta,
            "Staging synchronization"
        );

        // Same price, depth corrected to the new root
        let (vx, vy) = pool.virtual_balances();
        let (new_vx, new_vy) = CurveMath::split_root(new_root, vx, vy)?;
        let target_k = CurveMath::mul(new_root, new_root, "target depth")?;
        let derived_k = CurveMath::mul(new_vx, new_vy, "derived depth")?;
        let drift = (derived_k - target_k).abs();
        if drift >= self.tolerances.invariant {
            return Err(DammError::InvariantViolation {
                detail: format!(
                    "derived depth {} misses target {} by {} (tolerance {})",
                    derived_k, target_k, drift, self.tolerances.invariant
                ),
            });
        }

        // Global balances follow the pool's balance change since its last sync
        let (pool_x, pool_y) = pool.balances();
        let global_x = CurveMath::add(self.x, CurveMath::sub(pool_x, shadow.x, "pool x delta")?, "global x")?;
        let global_y = CurveMath::add(self.y, CurveMath::sub(pool_y, shadow.y, "pool y delta")?, "global y")?;

        let sync_point = self.ledger.next_point(CurveMath::add(
            self.ledger.latest().sqrt_k,
            local_delta,
            "ledger root",
        )?);

        let total_supply = CurveMath::add(self.total_supply, local_delta, "global supply")?;
        if total_supply < Decimal::ZERO {
            return Err(DammError::NegativeSupply {
                scope: "global".to_string(),
                value: total_supply,
            });
        }

        let pool_supply = CurveMath::add(shadow.total_supply, local_delta, "pool supply")?;
        if pool_supply < Decimal::ZERO {
            return Err(DammError::NegativeSupply {
                scope: shadow.name.clone(),
                value: pool_supply,
            });
        }

        let next_shadow = PoolShadowState {
            name: shadow.name.clone(),
            sqrt_k: new_root,
            x: pool_x,
            y: pool_y,
            total_supply: pool_supply,
            previous_sync_index: target_index,
            next_min_sync_index: sync_point.index,
            previous_delta: local_delta,
        };

        // Out-of-band corrective transfer
        let global_x = CurveMath::add(global_x, extra_x, "global x")?;
        let global_y = CurveMath::add(global_y, extra_y, "global y")?;

        let health_after = self.health_factor_of(global_x, global_y, total_supply)?;
        if let Some(after) = health_after {
            self.check_health(health_before, after)?;
        }

        Ok(StagedSync {
            virtual_balances: (new_vx, new_vy),
            global_balances: (global_x, global_y),
            total_supply,
            sync_point,
            shadow: next_shadow,
            report: SyncReport {
                pool: pool.name().to_string(),
                new_root,
                local_delta,
                sync_point,
                health_factor: health_after,
            },
        })
    }

    fn check_health(&self, before: Option<Decimal>, after: Decimal) -> Result<()> {
        if after < self.solvency.min_health_factor {
            return Err(DammError::HealthFactor {
                after,
                reason: format!("below minimum {}", self.solvency.min_health_factor),
            });
        }
        if let Some(before) = before {
            let drop = before - after;
            if drop >= self.solvency.max_health_factor_drop_per_sync {
                return Err(DammError::HealthFactor {
                    after,
                    reason: format!(
                        "dropped {} from {} (limit {} per sync)",
                        drop, before, self.solvency.max_health_factor_drop_per_sync
                    ),
                });
            }
        }
        Ok(())
    }

    fn commit(&mut self, pool: &mut Pool, staged: StagedSync) -> SyncReport {
        let (vx, vy) = staged.virtual_balances;
        pool.apply_virtual_balances(vx, vy);

        let (x, y) = staged.global_balances;
        self.x = x;
        self.y = y;
        self.total_supply = staged.total_supply;

        let appended = self.ledger.append(staged.sync_point.sqrt_k);
        debug_assert_eq!(appended, staged.sync_point);

        self.pools.insert(staged.shadow.name.clone(), staged.shadow);

        let report = staged.report;
        info!(
            damm = %self.name,
            pool = %report.pool,
            sync_index = report.sync_point.index,
            new_root = %report.new_root,
            local_delta = %report.local_delta,
            total_supply = %self.total_supply,
            health_factor = ?report.health_factor,
            "Synchronized pool"
        );
        report
    }

    /// Global depth `X * Y`
    pub fn k(&self) -> Result<Decimal> {
        CurveMath::mul(self.x, self.y, "global depth")
    }

    /// Solvency ratio `sqrt(X * Y) / supply`
    pub fn health_factor(&self) -> Result<Decimal> {
        self.health_factor_of(self.x, self.y, self.total_supply)?
            .ok_or(DammError::DivideByZero("health factor"))
    }

    fn health_factor_of(&self, x: Decimal, y: Decimal, supply: Decimal) -> Result<Option<Decimal>> {
        if x < Decimal::ZERO {
            return Err(DammError::Bounds {
                balance: "global x",
                value: x,
            });
        }
        if y < Decimal::ZERO {
            return Err(DammError::Bounds {
                balance: "global y",
                value: y,
            });
        }
        if supply.is_zero() {
            return Ok(None);
        }
        let backing = CurveMath::sqrt(CurveMath::mul(x, y, "global depth")?)?;
        Ok(Some(CurveMath::div(backing, supply, "health factor")?))
    }
}

impl fmt::Display for Damm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        match self.health_factor() {
            Ok(hf) => writeln!(f, "HF: {}", hf),
            Err(_) => writeln!(f, "HF: n/a"),
        }
    }
}
