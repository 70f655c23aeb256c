use crate::symbol::Symbol;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Supplies the current market price for an instrument.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, symbol: &Symbol) -> Result<Decimal>;
    fn name(&self) -> &str;
}

/// Supplies the rate converting one unit of `base` into `quote`.
#[async_trait]
pub trait FxSource: Send + Sync {
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<Decimal>;
}
