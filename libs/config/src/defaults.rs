//! Default parameter values
//!
//! Every tolerance the engine applies is named here so that it can be
//! overridden through [`DammConfig`](crate::DammConfig) instead of being a
//! literal buried in the math.

/// Solvency defaults enforced by the aggregator
pub mod solvency {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Minimum acceptable `sqrt(X * Y) / supply` after a synchronization
    pub const MIN_HEALTH_FACTOR: Decimal = dec!(0.9);

    /// Largest health factor decrease a single synchronization may cause
    pub const MAX_HEALTH_FACTOR_DROP_PER_SYNC: Decimal = dec!(0.9);
}

/// Numeric tolerances
pub mod tolerances {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Maximum `|vx/vy - amount_x/amount_y|` accepted by a join
    pub const JOIN_RATIO_TOLERANCE: Decimal = dec!(0.01);

    /// Maximum `|vx' * vy' - root^2|` accepted when re-deriving virtual balances
    pub const INVARIANT_TOLERANCE: Decimal = dec!(1);

    /// Rounding residue below which a debited balance settles at zero
    pub const DUST_TOLERANCE: Decimal = dec!(0.000000000000000001);
}

/// Pool construction defaults
pub mod pool {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Basis points in a whole (10_000 bps = 100%)
    pub const BPS_DENOMINATOR: u32 = 10_000;

    /// Swap fee for pools built with defaults
    pub const DEFAULT_FEE_BPS: u32 = 0;

    /// Reserved amplification factor for pools built with defaults
    pub const DEFAULT_AMPLIFICATION: Decimal = dec!(1);
}

/// Logging defaults
pub mod logging {
    /// Filter directive used when `RUST_LOG` is not set
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}
