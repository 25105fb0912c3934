//! Constant-product pool with separate actual and virtual balances
//!
//! Actual balances (`x`, `y`) track what the pool holds. Virtual balances
//! (`vx`, `vy`) drive pricing and are re-derived by the aggregator on every
//! synchronization, which lets a pool quote against the depth of the whole
//! aggregate while only holding its own share of the assets.

use crate::error::{DammError, Result};
use crate::impermanent_loss;
use crate::math::CurveMath;
use crate::pool_traits::{AmmPool, SwapDirection};
use damm_config::defaults::pool::{BPS_DENOMINATOR, DEFAULT_AMPLIFICATION, DEFAULT_FEE_BPS};
use damm_config::defaults::tolerances::{DUST_TOLERANCE, JOIN_RATIO_TOLERANCE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Amounts exchanged by a swap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub amount_in: Decimal,
    pub amount_out: Decimal,
}

/// A single liquidity pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    name: String,

    // Actual balances
    x: Decimal,
    y: Decimal,

    // Virtual balances, used only for pricing
    vx: Decimal,
    vy: Decimal,

    fee_bps: u32,

    /// Reserved for amplified curve variants; only read by impermanent loss
    amplification: Decimal,
}

impl Pool {
    /// Create an empty pool
    pub fn new(name: impl Into<String>, fee_bps: u32, amplification: Decimal) -> Result<Self> {
        if fee_bps >= BPS_DENOMINATOR {
            return Err(DammError::InvalidParameter {
                name: "fee_bps",
                reason: format!("{} must be below {}", fee_bps, BPS_DENOMINATOR),
            });
        }
        if amplification <= Decimal::ZERO {
            return Err(DammError::InvalidParameter {
                name: "amplification",
                reason: format!("{} must be positive", amplification),
            });
        }

        Ok(Self {
            name: name.into(),
            x: Decimal::ZERO,
            y: Decimal::ZERO,
            vx: Decimal::ZERO,
            vy: Decimal::ZERO,
            fee_bps,
            amplification,
        })
    }

    /// Empty pool with zero fee and unit amplification
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: Decimal::ZERO,
            y: Decimal::ZERO,
            vx: Decimal::ZERO,
            vy: Decimal::ZERO,
            fee_bps: DEFAULT_FEE_BPS,
            amplification: DEFAULT_AMPLIFICATION,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actual balances `(x, y)`
    pub fn balances(&self) -> (Decimal, Decimal) {
        (self.x, self.y)
    }

    /// Virtual balances `(vx, vy)`
    pub fn virtual_balances(&self) -> (Decimal, Decimal) {
        (self.vx, self.vy)
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    pub fn amplification(&self) -> Decimal {
        self.amplification
    }

    /// True once both virtual balances are positive
    pub fn has_liquidity(&self) -> bool {
        self.vx > Decimal::ZERO && self.vy > Decimal::ZERO
    }

    /// Add liquidity at the current price with the default ratio tolerance
    pub fn join(&mut self, amount_x: Decimal, amount_y: Decimal) -> Result<Decimal> {
        self.join_with_tolerance(amount_x, amount_y, JOIN_RATIO_TOLERANCE)
    }

    /// Add liquidity, returning the mint amount `sqrt(amount_x * amount_y)`.
    ///
    /// Once the pool is priced, `|vx/vy - amount_x/amount_y|` must stay below
    /// `tolerance`. Both actual and virtual balances grow by the same amounts.
    pub fn join_with_tolerance(
        &mut self,
        amount_x: Decimal,
        amount_y: Decimal,
        tolerance: Decimal,
    ) -> Result<Decimal> {
        require_positive("amount_x", amount_x)?;
        require_positive("amount_y", amount_y)?;

        if self.has_liquidity() {
            let pool_ratio = CurveMath::div(self.vx, self.vy, "pool ratio")?;
            let join_ratio = CurveMath::div(amount_x, amount_y, "join ratio")?;
            if (pool_ratio - join_ratio).abs() >= tolerance {
                return Err(DammError::RatioInvalid {
                    pool_ratio,
                    join_ratio,
                    tolerance,
                });
            }
        }

        let mint_amount = CurveMath::geometric_mean(amount_x, amount_y)?;

        let x = credit(self.x, amount_x)?;
        let y = credit(self.y, amount_y)?;
        let vx = credit(self.vx, amount_x)?;
        let vy = credit(self.vy, amount_y)?;

        self.x = x;
        self.y = y;
        self.vx = vx;
        self.vy = vy;

        debug!(pool = %self.name, %amount_x, %amount_y, %mint_amount, "Joined pool");
        Ok(mint_amount)
    }

    /// Remove liquidity worth `burn_amount` shares without moving the price.
    ///
    /// Returns `(amount_x, amount_y)` with `sqrt(amount_x * amount_y) = burn_amount`
    /// and `amount_y / amount_x = vy / vx`. The caller burns the shares.
    pub fn exit(&mut self, burn_amount: Decimal) -> Result<(Decimal, Decimal)> {
        require_positive("burn_amount", burn_amount)?;
        if !self.has_liquidity() {
            return Err(DammError::EmptyPool(self.name.clone()));
        }

        let (amount_x, amount_y) = CurveMath::split_root(burn_amount, self.vx, self.vy)?;

        let x = debit("x", self.x, amount_x)?;
        let y = debit("y", self.y, amount_y)?;
        let vx = debit("vx", self.vx, amount_x)?;
        let vy = debit("vy", self.vy, amount_y)?;

        self.x = x;
        self.y = y;
        self.vx = vx;
        self.vy = vy;

        debug!(pool = %self.name, %burn_amount, %amount_x, %amount_y, "Exited pool");
        Ok((amount_x, amount_y))
    }

    /// Pay X, receive Y. Applies the pool fee.
    pub fn buy_y(&mut self, amount_in: Decimal) -> Result<SwapOutcome> {
        let amount_out = self.quote_buy_y(amount_in)?;
        self.apply_swap(SwapDirection::BuyY, amount_in, amount_out)
    }

    /// Pay Y, receive X. Always fee-free.
    pub fn buy_x(&mut self, amount_in: Decimal) -> Result<SwapOutcome> {
        let amount_out = self.quote_buy_x(amount_in)?;
        self.apply_swap(SwapDirection::BuyX, amount_in, amount_out)
    }

    /// Y received for `amount_in` of X
    pub fn quote_buy_y(&self, amount_in: Decimal) -> Result<Decimal> {
        self.require_liquidity()?;
        CurveMath::calculate_output_amount(amount_in, self.vx, self.vy, self.fee_bps)
    }

    /// X received for `amount_in` of Y
    pub fn quote_buy_x(&self, amount_in: Decimal) -> Result<Decimal> {
        self.require_liquidity()?;
        CurveMath::calculate_output_amount_no_fee(amount_in, self.vy, self.vx)
    }

    fn apply_swap(
        &mut self,
        direction: SwapDirection,
        amount_in: Decimal,
        amount_out: Decimal,
    ) -> Result<SwapOutcome> {
        let (x, y, vx, vy) = match direction {
            SwapDirection::BuyY => (
                credit(self.x, amount_in)?,
                debit("y", self.y, amount_out)?,
                credit(self.vx, amount_in)?,
                debit("vy", self.vy, amount_out)?,
            ),
            SwapDirection::BuyX => (
                debit("x", self.x, amount_out)?,
                credit(self.y, amount_in)?,
                debit("vx", self.vx, amount_out)?,
                credit(self.vy, amount_in)?,
            ),
        };

        self.x = x;
        self.y = y;
        self.vx = vx;
        self.vy = vy;

        debug!(pool = %self.name, ?direction, %amount_in, %amount_out, "Swapped");
        Ok(SwapOutcome {
            amount_in,
            amount_out,
        })
    }

    /// Overwrite the virtual balances
    pub fn set_virtual_balances(&mut self, vx: Decimal, vy: Decimal) -> Result<()> {
        require_positive("vx", vx)?;
        require_positive("vy", vy)?;
        self.vx = vx;
        self.vy = vy;
        Ok(())
    }

    /// Adjust actual balances by signed amounts; virtual balances are untouched
    pub fn add_balances(&mut self, amount_x: Decimal, amount_y: Decimal) -> Result<()> {
        let x = adjust("x", self.x, amount_x)?;
        let y = adjust("y", self.y, amount_y)?;
        self.x = x;
        self.y = y;
        Ok(())
    }

    /// Depth `k = vx * vy`
    pub fn k(&self) -> Result<Decimal> {
        CurveMath::mul(self.vx, self.vy, "pool depth")
    }

    /// Actual balance product `x * y`
    pub fn kb(&self) -> Result<Decimal> {
        CurveMath::mul(self.x, self.y, "pool balance product")
    }

    /// Spot price `vy / vx`
    pub fn price(&self) -> Result<Decimal> {
        CurveMath::div(self.vy, self.vx, "pool price")
    }

    /// Actual balance ratio `y / x`
    pub fn ratio(&self) -> Result<Decimal> {
        CurveMath::div(self.y, self.x, "pool balance ratio")
    }

    /// Impermanent loss of this pool's curve for a price move of `price_ratio`
    pub fn impermanent_loss(&self, price_ratio: Decimal) -> Result<Decimal> {
        impermanent_loss::amplified_il(self.amplification, price_ratio)
    }

    /// Replace virtual balances after a synchronization has been validated
    pub(crate) fn apply_virtual_balances(&mut self, vx: Decimal, vy: Decimal) {
        self.vx = vx;
        self.vy = vy;
    }

    fn require_liquidity(&self) -> Result<()> {
        if !self.has_liquidity() {
            return Err(DammError::EmptyPool(self.name.clone()));
        }
        Ok(())
    }
}

impl AmmPool for Pool {
    fn get_amount_out(&self, amount_in: Decimal, direction: SwapDirection) -> Result<Decimal> {
        match direction {
            SwapDirection::BuyY => self.quote_buy_y(amount_in),
            SwapDirection::BuyX => self.quote_buy_x(amount_in),
        }
    }

    fn get_liquidity(&self) -> (Decimal, Decimal) {
        (self.vx, self.vy)
    }

    fn get_fee_bps(&self, direction: SwapDirection) -> u32 {
        match direction {
            SwapDirection::BuyY => self.fee_bps,
            SwapDirection::BuyX => 0,
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "vx = {}", self.vx)?;
        writeln!(f, "vy = {}", self.vy)?;
        writeln!(f, "x = {}", self.x)?;
        writeln!(f, "y = {}", self.y)?;
        match self.price() {
            Ok(price) => writeln!(f, "p = {}", price)?,
            Err(_) => writeln!(f, "p = n/a")?,
        }
        match self.kb() {
            Ok(kb) => writeln!(f, "kb = {}", kb)?,
            Err(_) => writeln!(f, "kb = overflow")?,
        }
        match self.k() {
            Ok(k) => writeln!(f, "k = {}", k),
            Err(_) => writeln!(f, "k = overflow"),
        }
    }
}

/// Move actual balances from one pool to another
pub fn transfer(from: &mut Pool, to: &mut Pool, amount_x: Decimal, amount_y: Decimal) -> Result<()> {
    if amount_x < Decimal::ZERO {
        return Err(DammError::InvalidAmount {
            field: "amount_x",
            value: amount_x,
        });
    }
    if amount_y < Decimal::ZERO {
        return Err(DammError::InvalidAmount {
            field: "amount_y",
            value: amount_y,
        });
    }

    let from_x = debit("x", from.x, amount_x)?;
    let from_y = debit("y", from.y, amount_y)?;
    let to_x = credit(to.x, amount_x)?;
    let to_y = credit(to.y, amount_y)?;

    from.x = from_x;
    from.y = from_y;
    to.x = to_x;
    to.y = to_y;

    debug!(from = %from.name, to = %to.name, %amount_x, %amount_y, "Transferred balances");
    Ok(())
}

/// Move every actual balance `from` holds into `to`
pub fn transfer_all(from: &mut Pool, to: &mut Pool) -> Result<()> {
    let (amount_x, amount_y) = from.balances();
    transfer(from, to, amount_x, amount_y)
}

fn require_positive(field: &'static str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(DammError::InvalidAmount { field, value });
    }
    Ok(())
}

fn credit(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(amount)
        .ok_or(DammError::Overflow("balance credit"))
}

/// Subtract, settling rounding residue within dust tolerance at zero
fn debit(balance_name: &'static str, balance: Decimal, amount: Decimal) -> Result<Decimal> {
    let value = balance - amount;
    if value >= Decimal::ZERO {
        Ok(value)
    } else if -value <= DUST_TOLERANCE {
        Ok(Decimal::ZERO)
    } else {
        Err(DammError::Bounds {
            balance: balance_name,
            value,
        })
    }
}

fn adjust(balance_name: &'static str, balance: Decimal, delta: Decimal) -> Result<Decimal> {
    if delta >= Decimal::ZERO {
        credit(balance, delta)
    } else {
        debit(balance_name, balance, -delta)
    }
}
