//! Error types for pool and aggregator operations
//!
//! Every precondition and post-condition check in the engine surfaces as one
//! of these variants. None are retried internally.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, DammError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DammError {
    /// Join amounts deviate from the current virtual price
    #[error("Ratio invalid: pool ratio {pool_ratio} vs join ratio {join_ratio} (tolerance {tolerance})")]
    RatioInvalid {
        pool_ratio: Decimal,
        join_ratio: Decimal,
        tolerance: Decimal,
    },

    /// An actual or virtual balance would become negative
    #[error("Out of bounds: {balance} would become {value}")]
    Bounds { balance: &'static str, value: Decimal },

    /// Sync target is behind the pool's floor or past the end of the ledger
    #[error("Invalid sync point {requested}: {reason}")]
    InvalidSyncPoint { requested: u64, reason: String },

    /// Re-derived virtual balances do not reproduce the target invariant
    #[error("Invariant violation: {detail}")]
    InvariantViolation { detail: String },

    /// Global or per-pool supply would drop below zero
    #[error("Negative supply for {scope}: {value}")]
    NegativeSupply { scope: String, value: Decimal },

    /// Health factor below the floor or dropping too fast
    #[error("Health factor {after} rejected: {reason}")]
    HealthFactor { after: Decimal, reason: String },

    #[error("Pool not registered: {0}")]
    NotFound(String),

    #[error("Pool already registered: {0}")]
    DuplicateName(String),

    #[error("Division by zero computing {0}")]
    DivideByZero(&'static str),

    /// Amount must be strictly positive
    #[error("Invalid amount for {field}: {value}")]
    InvalidAmount { field: &'static str, value: Decimal },

    /// Operation needs positive virtual balances
    #[error("Pool {0} has no liquidity")]
    EmptyPool(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Result exceeds the Decimal range
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),
}
