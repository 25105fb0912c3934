//! Impermanent loss of a liquidity position relative to holding
//!
//! Returned values are fractions: `-0.0572` means the position is worth
//! 5.72% less than the assets it was opened with.

use crate::error::{DammError, Result};
use crate::math::CurveMath;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Loss of a full-range constant-product position after the price moved by
/// `price_ratio` (new price / entry price): `2 * sqrt(r) / (1 + r) - 1`
pub fn constant_product_il(price_ratio: Decimal) -> Result<Decimal> {
    require_positive("price_ratio", price_ratio)?;
    let sqrt_ratio = CurveMath::sqrt(price_ratio)?;
    let denominator = CurveMath::add(Decimal::ONE, price_ratio, "impermanent loss")?;
    let value = CurveMath::div(dec!(2) * sqrt_ratio, denominator, "impermanent loss")?;
    Ok(value - Decimal::ONE)
}

/// Loss of a position concentrated on `[lower, upper]`, opened at `entry`
/// and marked at `price`
pub fn concentrated_il(
    price: Decimal,
    lower: Decimal,
    upper: Decimal,
    entry: Decimal,
) -> Result<Decimal> {
    require_positive("price", price)?;
    require_positive("lower", lower)?;
    require_positive("upper", upper)?;
    require_positive("entry", entry)?;

    let sqrt_price = CurveMath::sqrt(price)?;
    let sqrt_lower = CurveMath::sqrt(lower)?;
    let sqrt_upper = CurveMath::sqrt(upper)?;
    let sqrt_entry = CurveMath::sqrt(entry)?;

    let over_upper = CurveMath::div(price, sqrt_upper, "concentrated impermanent loss")?;
    let over_entry = CurveMath::div(price, sqrt_entry, "concentrated impermanent loss")?;
    let numerator = dec!(2) * sqrt_price - over_upper - sqrt_lower;
    let denominator = over_entry - over_upper + sqrt_entry - sqrt_lower;

    let value = CurveMath::div(numerator, denominator, "concentrated impermanent loss")?;
    Ok(value - Decimal::ONE)
}

/// Constant-product loss scaled by an amplification factor
pub fn amplified_il(amplification: Decimal, price_ratio: Decimal) -> Result<Decimal> {
    CurveMath::mul(amplification, constant_product_il(price_ratio)?, "amplified loss")
}

fn require_positive(field: &'static str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(DammError::InvalidAmount { field, value });
    }
    Ok(())
}
