//! Position sizing for leveraged futures.
//!
//! Liquidation uses the isolated-margin approximation that ignores
//! maintenance margin and fees:
//!
//! ```text
//! long:  liq = entry * (1 - 1/leverage)
//! short: liq = entry * (1 + 1/leverage)
//! ```
//!
//! All arithmetic is done in the instrument's quote currency.

use crate::error::{Result, SizingError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Direction of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = SizingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(Self::Long),
            "short" | "sell" => Ok(Self::Short),
            other => Err(SizingError::invalid_input(format!(
                "side must be 'long' or 'short', got '{other}'"
            ))),
        }
    }
}

/// Inputs for one sizing computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInputs {
    /// Entry price, quote currency per unit
    pub entry_price: Decimal,
    /// Account equity in quote currency
    pub equity: Decimal,
    /// Leverage multiplier
    pub leverage: Decimal,
    pub side: Side,
    /// Optional stop loss price
    pub stop_loss_price: Option<Decimal>,
    /// Percent of equity (0, 100] to lose if the stop is hit
    pub risk_percent: Option<Decimal>,
}

impl PositionInputs {
    #[must_use]
    pub const fn new(entry_price: Decimal, equity: Decimal, leverage: Decimal, side: Side) -> Self {
        Self {
            entry_price,
            equity,
            leverage,
            side,
            stop_loss_price: None,
            risk_percent: None,
        }
    }

    #[must_use]
    pub const fn with_stop_loss(mut self, stop_loss_price: Decimal) -> Self {
        self.stop_loss_price = Some(stop_loss_price);
        self
    }

    #[must_use]
    pub const fn with_risk_percent(mut self, risk_percent: Decimal) -> Self {
        self.risk_percent = Some(risk_percent);
        self
    }
}

/// Risk-based sizing, present only when both a stop and a risk percent are supplied.
///
/// Both the raw risk size and the margin-capped size are kept so callers can
/// see when the risk budget asks for more than the account can margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSizing {
    /// `equity * risk_percent / 100`
    pub risk_amount: Decimal,
    /// `|entry - stop|`
    pub per_unit_loss: Decimal,
    /// `risk_amount / per_unit_loss`, uncapped
    pub units_by_risk: Decimal,
    /// `min(units_by_risk, max_units_by_margin)`
    pub margin_capped_units: Decimal,
    /// Whether `units_by_risk` exceeded the margin limit
    pub exceeds_margin: bool,
}

/// Result of [`compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOutputs {
    pub liquidation_price: Decimal,
    pub margin_per_unit: Decimal,
    pub max_units_by_margin: Decimal,
    pub risk: Option<RiskSizing>,
}

impl PositionOutputs {
    /// Raw risk-based units, if risk sizing was requested.
    #[must_use]
    pub fn recommended_units_by_risk(&self) -> Option<Decimal> {
        self.risk.map(|r| r.units_by_risk)
    }

    /// Units to actually open: the margin-capped risk size, or the margin
    /// maximum when no risk sizing was requested.
    #[must_use]
    pub fn recommended_units(&self) -> Decimal {
        self.risk
            .map_or(self.max_units_by_margin, |r| r.margin_capped_units)
    }

    /// Margin needed for [`Self::recommended_units`].
    #[must_use]
    pub fn recommended_margin_capital(&self) -> Decimal {
        self.recommended_units() * self.margin_per_unit
    }

    /// Checks whether `live_price` has already crossed the liquidation price.
    #[must_use]
    pub fn live_guard(&self, side: Side, live_price: Decimal) -> LiveGuard {
        let crossed = match side {
            Side::Long => live_price <= self.liquidation_price,
            Side::Short => live_price >= self.liquidation_price,
        };
        if crossed {
            LiveGuard::PastLiquidation
        } else {
            LiveGuard::Clear
        }
    }
}

/// Outcome of comparing the live price against the computed liquidation price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiveGuard {
    Clear,
    /// Opening now would be liquidated immediately.
    PastLiquidation,
}

impl LiveGuard {
    #[must_use]
    pub const fn is_clear(self) -> bool {
        matches!(self, Self::Clear)
    }
}

/// Computes liquidation price, margin per unit, margin-limited size and
/// (optionally) risk-based size.
///
/// # Errors
/// Returns [`SizingError::InvalidInput`] for non-positive entry, equity or
/// leverage, a risk percent outside (0, 100], or decimal overflow.
/// Returns [`SizingError::InvalidStopLoss`] when the stop is non-positive,
/// equal to entry, or on the wrong side of entry for `side`.
///
/// # Examples
/// ```
/// use liq_sizer_core::sizing::{compute, PositionInputs, Side};
/// use rust_decimal::Decimal;
///
/// let inputs = PositionInputs::new(
///     Decimal::from(100),
///     Decimal::from(1000),
///     Decimal::from(10),
///     Side::Long,
/// );
/// let out = compute(&inputs).unwrap();
/// assert_eq!(out.liquidation_price, Decimal::from(90));
/// assert_eq!(out.max_units_by_margin, Decimal::from(100));
/// ```
pub fn compute(inputs: &PositionInputs) -> Result<PositionOutputs> {
    validate_inputs(inputs)?;
    if let Some(stop) = inputs.stop_loss_price {
        validate_stop_loss(inputs.entry_price, stop, inputs.side)?;
    }

    let margin_per_unit = margin_per_unit(inputs.entry_price, inputs.leverage)?;
    let max_units_by_margin = div(inputs.equity, margin_per_unit, "max units by margin")?;
    let liquidation_price = liquidation_price(inputs.entry_price, inputs.leverage, inputs.side)?;

    let risk = match (inputs.stop_loss_price, inputs.risk_percent) {
        (Some(stop), Some(risk_percent)) => Some(risk_sizing(
            inputs.entry_price,
            inputs.equity,
            stop,
            risk_percent,
            max_units_by_margin,
        )?),
        _ => None,
    };

    Ok(PositionOutputs {
        liquidation_price,
        margin_per_unit,
        max_units_by_margin,
        risk,
    })
}

/// Approximate isolated-margin liquidation price.
///
/// # Errors
/// Returns an error if `entry` or `leverage` is not positive.
pub fn liquidation_price(entry: Decimal, leverage: Decimal, side: Side) -> Result<Decimal> {
    ensure_positive(entry, "entry price")?;
    ensure_positive(leverage, "leverage")?;

    let inverse = div(Decimal::ONE, leverage, "liquidation price")?;
    let factor = match side {
        Side::Long => Decimal::ONE - inverse,
        Side::Short => Decimal::ONE + inverse,
    };
    mul(entry, factor, "liquidation price")
}

/// Capital required to open one unit at `leverage`.
///
/// # Errors
/// Returns an error if `entry` or `leverage` is not positive.
pub fn margin_per_unit(entry: Decimal, leverage: Decimal) -> Result<Decimal> {
    ensure_positive(entry, "entry price")?;
    ensure_positive(leverage, "leverage")?;
    div(entry, leverage, "margin per unit")
}

fn risk_sizing(
    entry: Decimal,
    equity: Decimal,
    stop: Decimal,
    risk_percent: Decimal,
    max_units_by_margin: Decimal,
) -> Result<RiskSizing> {
    let risk_amount = div(mul(equity, risk_percent, "risk amount")?, ONE_HUNDRED, "risk amount")?;
    let per_unit_loss = (entry - stop).abs();
    if per_unit_loss.is_zero() {
        return Err(SizingError::invalid_stop_loss(format!(
            "stop loss {stop} equals entry {entry}; per-unit loss is zero"
        )));
    }

    let units_by_risk = div(risk_amount, per_unit_loss, "units by risk")?;
    let exceeds_margin = units_by_risk > max_units_by_margin;

    Ok(RiskSizing {
        risk_amount,
        per_unit_loss,
        units_by_risk,
        margin_capped_units: units_by_risk.min(max_units_by_margin),
        exceeds_margin,
    })
}

fn validate_inputs(inputs: &PositionInputs) -> Result<()> {
    ensure_positive(inputs.entry_price, "entry price")?;
    ensure_positive(inputs.equity, "equity")?;
    ensure_positive(inputs.leverage, "leverage")?;

    if let Some(risk) = inputs.risk_percent {
        if risk <= Decimal::ZERO || risk > ONE_HUNDRED {
            return Err(SizingError::invalid_input(format!(
                "risk percent must be in (0, 100], got {risk}"
            )));
        }
    }

    Ok(())
}

fn validate_stop_loss(entry: Decimal, stop: Decimal, side: Side) -> Result<()> {
    if stop <= Decimal::ZERO {
        return Err(SizingError::invalid_stop_loss(format!(
            "stop loss must be positive, got {stop}"
        )));
    }
    if stop == entry {
        return Err(SizingError::invalid_stop_loss(format!(
            "stop loss {stop} equals entry {entry}; per-unit loss is zero"
        )));
    }

    match side {
        Side::Long if stop > entry => Err(SizingError::invalid_stop_loss(format!(
            "long stop loss {stop} must be below entry {entry}"
        ))),
        Side::Short if stop < entry => Err(SizingError::invalid_stop_loss(format!(
            "short stop loss {stop} must be above entry {entry}"
        ))),
        _ => Ok(()),
    }
}

fn ensure_positive(value: Decimal, what: &str) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(SizingError::invalid_input(format!(
            "{what} must be positive, got {value}"
        )));
    }
    Ok(())
}

fn div(lhs: Decimal, rhs: Decimal, what: &str) -> Result<Decimal> {
    lhs.checked_div(rhs)
        .ok_or_else(|| SizingError::invalid_input(format!("{what} is out of range")))
}

fn mul(lhs: Decimal, rhs: Decimal, what: &str) -> Result<Decimal> {
    lhs.checked_mul(rhs)
        .ok_or_else(|| SizingError::invalid_input(format!("{what} is out of range")))
}
