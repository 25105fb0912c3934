//! Pool trait definitions for a unified quoting interface

use crate::error::Result;
use crate::Decimal;
use serde::{Deserialize, Serialize};

/// Swap direction, named after the asset being bought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Pay X, receive Y (`buy_y`)
    BuyY,
    /// Pay Y, receive X (`buy_x`)
    BuyX,
}

impl SwapDirection {
    pub fn reverse(self) -> Self {
        match self {
            SwapDirection::BuyY => SwapDirection::BuyX,
            SwapDirection::BuyX => SwapDirection::BuyY,
        }
    }
}

/// Read-only view over a pool's pricing curve
pub trait AmmPool {
    /// Calculate output amount for given input without mutating the pool
    fn get_amount_out(&self, amount_in: Decimal, direction: SwapDirection) -> Result<Decimal>;

    /// Get current virtual reserves `(vx, vy)`
    fn get_liquidity(&self) -> (Decimal, Decimal);

    /// Fee applied in the given direction, in basis points
    fn get_fee_bps(&self, direction: SwapDirection) -> u32;
}
