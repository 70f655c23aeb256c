use crate::config::PriceVenue;
use crate::error::SizingError;
use crate::sizing::{LiveGuard, PositionOutputs, Side};
use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxQuote {
    pub base: String,
    pub quote: String,
    pub rate: Decimal,
}

/// One coherent view of the position: the live price and FX rate were
/// captured in the same tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub venue: PriceVenue,
    pub side: Side,
    pub equity: Decimal,
    pub leverage: Decimal,
    pub live_price: Decimal,
    pub entry_price: Decimal,
    pub stop_loss_price: Option<Decimal>,
    pub risk_percent: Option<Decimal>,
    pub quote_currency: String,
    pub display_currency: String,
    /// `None` when the FX fetch failed this tick
    pub fx: Option<FxQuote>,
    pub outputs: PositionOutputs,
    pub guard: LiveGuard,
}

impl Snapshot {
    /// Recommended units, or zero when the live price is already past liquidation.
    #[must_use]
    pub fn effective_recommended_units(&self) -> Decimal {
        if self.guard.is_clear() {
            self.outputs.recommended_units()
        } else {
            Decimal::ZERO
        }
    }

    #[must_use]
    pub fn effective_margin_capital(&self) -> Decimal {
        self.effective_recommended_units() * self.outputs.margin_per_unit
    }

    /// Converts a quote-currency amount for display, if an FX rate is available.
    #[must_use]
    pub fn to_display(&self, amount: Decimal) -> Option<Decimal> {
        self.fx.as_ref().and_then(|fx| amount.checked_mul(fx.rate))
    }
}

/// What one monitor tick produced.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Snapshot(Box<Snapshot>),
    /// The price source failed; the tick was skipped.
    PriceUnavailable {
        timestamp: DateTime<Utc>,
        symbol: Symbol,
        message: String,
    },
    /// The calculator rejected the configured position.
    Rejected {
        timestamp: DateTime<Utc>,
        live_price: Decimal,
        error: SizingError,
    },
}
