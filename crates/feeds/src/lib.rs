//! Live price and FX rate sources for the liquidation and position sizer.
//!
//! This crate provides:
//! - Binance USD-M futures last price with a book-mid fallback
//! - Hyperliquid perpetual mid prices
//! - exchangerate.host currency conversion rates
//! - A rate-limited JSON HTTP client shared by all three
//!
//! # Example
//!
//! ```ignore
//! use liq_sizer_core::{FeedsConfig, PriceSource, Symbol};
//! use liq_sizer_feeds::price_source_from_config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = price_source_from_config(&FeedsConfig::default())?;
//!     let price = source.fetch_price(&Symbol::new("BTC/USDT")?).await?;
//!     println!("{} BTC/USDT {price}", source.name());
//!     Ok(())
//! }
//! ```

pub mod binance;
pub mod error;
pub mod fx;
mod http;
pub mod hyperliquid;

pub use binance::{BinanceFuturesClient, BINANCE_FUTURES_URL};
pub use error::{FeedError, Result};
pub use fx::{ExchangeRateClient, EXCHANGE_RATE_HOST_URL};
pub use http::ClientConfig;
pub use hyperliquid::{HyperliquidPriceClient, HYPERLIQUID_API_URL};

use async_trait::async_trait;
use liq_sizer_core::{FeedsConfig, PriceSource, PriceVenue, Symbol};
use rust_decimal::Decimal;

/// Price client for whichever venue the configuration selects.
pub enum AnyPriceSource {
    Binance(BinanceFuturesClient),
    Hyperliquid(HyperliquidPriceClient),
}

#[async_trait]
impl PriceSource for AnyPriceSource {
    async fn fetch_price(&self, symbol: &Symbol) -> anyhow::Result<Decimal> {
        match self {
            Self::Binance(client) => client.fetch_price(symbol).await,
            Self::Hyperliquid(client) => client.fetch_price(symbol).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Binance(client) => client.name(),
            Self::Hyperliquid(client) => client.name(),
        }
    }
}

/// Builds the price client for `feeds.venue`.
///
/// # Errors
/// Returns an error if the rate limit is zero or the HTTP client cannot be built.
pub fn price_source_from_config(feeds: &FeedsConfig) -> Result<AnyPriceSource> {
    let source = match feeds.venue {
        PriceVenue::Binance => {
            let config = ClientConfig::from_parts(
                &feeds.binance_url,
                feeds.timeout_secs,
                feeds.requests_per_second,
            )?;
            AnyPriceSource::Binance(BinanceFuturesClient::new(&config)?)
        }
        PriceVenue::Hyperliquid => {
            let config = ClientConfig::from_parts(
                &feeds.hyperliquid_url,
                feeds.timeout_secs,
                feeds.requests_per_second,
            )?;
            AnyPriceSource::Hyperliquid(HyperliquidPriceClient::new(&config)?)
        }
    };
    tracing::debug!(venue = %feeds.venue, "Price source ready");
    Ok(source)
}

/// Builds the FX client, attaching the access key when one is configured.
///
/// # Errors
/// Returns an error if the rate limit is zero or the HTTP client cannot be built.
pub fn fx_source_from_config(feeds: &FeedsConfig) -> Result<ExchangeRateClient> {
    let config =
        ClientConfig::from_parts(&feeds.fx_url, feeds.timeout_secs, feeds.requests_per_second)?;
    let client = ExchangeRateClient::new(&config)?;
    Ok(match feeds.fx_access_key.as_deref() {
        Some(key) if !key.trim().is_empty() => client.with_access_key(key.trim()),
        _ => client,
    })
}
