//! Constant-product curve math with exact decimal arithmetic
//!
//! All pool and aggregator formulas go through these helpers so that the
//! precision policy lives in one place: `Decimal` everywhere, Newton square
//! roots, checked multiplication at the Decimal range limit.

use crate::error::{DammError, Result};
use damm_config::defaults::pool::BPS_DENOMINATOR;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Newton iterations stop once successive estimates differ by less than this
const SQRT_EPSILON: Decimal = dec!(0.000000000000000000001);

const SQRT_MAX_ITERATIONS: usize = 64;

/// Curve math functions over virtual reserves
pub struct CurveMath;

impl CurveMath {
    /// Calculate exact output amount using the x*y=k formula
    ///
    /// # Arguments
    /// * `amount_in` - Amount added to the input reserve
    /// * `reserve_in` - Virtual reserve of the input side
    /// * `reserve_out` - Virtual reserve of the output side
    /// * `fee_bps` - Fee in basis points (30 = 0.3%)
    ///
    /// # Returns
    /// `amount_in * (1 - fee) * reserve_out / (reserve_in + amount_in * (1 - fee))`
    pub fn calculate_output_amount(
        amount_in: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
        fee_bps: u32,
    ) -> Result<Decimal> {
        if amount_in <= Decimal::ZERO {
            return Err(DammError::InvalidAmount {
                field: "amount_in",
                value: amount_in,
            });
        }
        if fee_bps >= BPS_DENOMINATOR {
            return Err(DammError::InvalidParameter {
                name: "fee_bps",
                reason: format!("{} must be below {}", fee_bps, BPS_DENOMINATOR),
            });
        }

        // Apply fee: amount_in_after_fee = amount_in * (10000 - fee_bps) / 10000
        let fee_multiplier = Self::div(
            Decimal::from(BPS_DENOMINATOR - fee_bps),
            Decimal::from(BPS_DENOMINATOR),
            "swap fee",
        )?;
        let amount_in_after_fee = Self::mul(amount_in, fee_multiplier, "swap fee")?;

        let numerator = Self::mul(amount_in_after_fee, reserve_out, "swap numerator")?;
        let denominator = reserve_in
            .checked_add(amount_in_after_fee)
            .ok_or(DammError::Overflow("swap denominator"))?;

        if denominator <= Decimal::ZERO {
            return Err(DammError::DivideByZero("swap output"));
        }

        Self::div(numerator, denominator, "swap output")
    }

    /// Output amount with the fee term disabled
    pub fn calculate_output_amount_no_fee(
        amount_in: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
    ) -> Result<Decimal> {
        Self::calculate_output_amount(amount_in, reserve_in, reserve_out, 0)
    }

    /// Split an invariant root into two balances at the ratio `a / b`.
    ///
    /// Returns `(sqrt(root^2 * a / b), sqrt(root^2 * b / a))`, the unique pair
    /// whose geometric mean is `root` and whose quotient is `a / b`. Used by
    /// exit (root = burn amount) and by synchronization (root = new global root).
    pub fn split_root(root: Decimal, a: Decimal, b: Decimal) -> Result<(Decimal, Decimal)> {
        if a <= Decimal::ZERO || b <= Decimal::ZERO {
            return Err(DammError::DivideByZero("balance ratio"));
        }
        let root_squared = Self::mul(root, root, "root squared")?;
        let first = Self::sqrt(Self::mul(root_squared, Self::div(a, b, "balance ratio")?, "split root")?)?;
        let second = Self::sqrt(Self::mul(root_squared, Self::div(b, a, "balance ratio")?, "split root")?)?;
        Ok((first, second))
    }

    /// Geometric mean `sqrt(a * b)`, the LP-share convention for joins
    pub fn geometric_mean(a: Decimal, b: Decimal) -> Result<Decimal> {
        Self::sqrt(Self::mul(a, b, "geometric mean")?)
    }

    /// Checked addition, naming the computation on overflow
    pub fn add(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
        a.checked_add(b).ok_or(DammError::Overflow(operation))
    }

    /// Checked subtraction, naming the computation on overflow
    pub fn sub(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
        a.checked_sub(b).ok_or(DammError::Overflow(operation))
    }

    /// Checked multiplication, naming the computation on overflow
    pub fn mul(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
        a.checked_mul(b).ok_or(DammError::Overflow(operation))
    }

    /// Checked division; a zero divisor is `DivideByZero`, an out-of-range
    /// quotient is `Overflow`
    pub fn div(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
        if b.is_zero() {
            return Err(DammError::DivideByZero(operation));
        }
        a.checked_div(b).ok_or(DammError::Overflow(operation))
    }

    /// Calculate square root of a Decimal using Newton's method
    ///
    /// Seeded from the f64 square root so convergence takes a few steps.
    pub fn sqrt(value: Decimal) -> Result<Decimal> {
        if value < Decimal::ZERO {
            return Err(DammError::InvalidAmount {
                field: "sqrt operand",
                value,
            });
        }
        if value.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let mut x = value
            .to_f64()
            .map(f64::sqrt)
            .and_then(Decimal::from_f64)
            .filter(|guess| *guess > Decimal::ZERO)
            .unwrap_or(value);

        // Newton's method: x_new = (x + value/x) / 2
        for _ in 0..SQRT_MAX_ITERATIONS {
            let next_x = Self::add(x, Self::div(value, x, "sqrt")?, "sqrt")? / dec!(2);

            if (next_x - x).abs() < SQRT_EPSILON {
                return Ok(next_x);
            }

            x = next_x;
        }

        // Return best approximation if not fully converged
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_calculation() {
        // 100 tokens in, 1000:2000 reserves, 0.3% fee
        let output = CurveMath::calculate_output_amount(dec!(100), dec!(1000), dec!(2000), 30).unwrap();

        // Expected: ~181.32 tokens out
        assert!((output - dec!(181.32)).abs() < dec!(0.01));
    }

    #[test]
    fn test_no_fee_output() {
        let output = CurveMath::calculate_output_amount_no_fee(dec!(10), dec!(200), dec!(200)).unwrap();
        // 10 * 200 / 210
        assert!((output - dec!(9.523809523809523809523809524)).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_output_rejects_bad_inputs() {
        assert!(matches!(
            CurveMath::calculate_output_amount(dec!(0), dec!(100), dec!(100), 0),
            Err(DammError::InvalidAmount { .. })
        ));
        assert!(matches!(
            CurveMath::calculate_output_amount(dec!(1), dec!(100), dec!(100), 10_000),
            Err(DammError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_sqrt_accuracy() {
        let result = CurveMath::sqrt(dec!(100)).unwrap();
        assert!((result - dec!(10)).abs() < dec!(0.000000000001));

        let result = CurveMath::sqrt(dec!(2)).unwrap();
        assert!((result - dec!(1.41421356237309504880)).abs() < dec!(0.000000000001));

        let result = CurveMath::sqrt(dec!(0.0001)).unwrap();
        assert!((result - dec!(0.01)).abs() < dec!(0.000000000001));

        assert_eq!(CurveMath::sqrt(Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert!(CurveMath::sqrt(dec!(-1)).is_err());
    }

    #[test]
    fn test_split_root_preserves_ratio_and_mean() {
        let (a, b) = CurveMath::split_root(dec!(200), dec!(100), dec!(400)).unwrap();
        assert!((a - dec!(100)).abs() < dec!(0.000000001));
        assert!((b - dec!(400)).abs() < dec!(0.000000001));
        assert!((a * b - dec!(40000)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_div_is_checked() {
        assert_eq!(CurveMath::div(dec!(1), dec!(4), "quarter").unwrap(), dec!(0.25));
        assert!(matches!(
            CurveMath::div(dec!(1), Decimal::ZERO, "zero"),
            Err(DammError::DivideByZero("zero"))
        ));
        assert!(matches!(
            CurveMath::div(dec!(1000000000000000000000), dec!(0.00000001), "ratio"),
            Err(DammError::Overflow("ratio"))
        ));
    }

    #[test]
    fn test_split_root_rejects_extreme_ratio() {
        assert!(matches!(
            CurveMath::split_root(dec!(1), dec!(1000000000000000000000), dec!(0.00000001)),
            Err(DammError::Overflow(_))
        ));
    }

    #[test]
    fn test_split_root_requires_positive_ratio() {
        assert!(matches!(
            CurveMath::split_root(dec!(1), Decimal::ZERO, dec!(1)),
            Err(DammError::DivideByZero(_))
        ));
    }
}
