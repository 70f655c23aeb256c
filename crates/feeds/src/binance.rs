//! Binance USD-M futures ticker client.
//!
//! Uses the last traded price, falling back to the book mid when the last
//! price is missing or non-positive.

use crate::error::{FeedError, Result};
use crate::http::{ClientConfig, HttpClient};
use async_trait::async_trait;
use liq_sizer_core::{PriceSource, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Binance USD-M futures REST base URL.
pub const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";

const VENUE: &str = "binance";

/// Binance error code for an unknown symbol.
const INVALID_SYMBOL_CODE: i64 = -1121;

#[derive(Debug, Deserialize)]
struct RawTickerPrice {
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBookTicker {
    bid_price: Option<String>,
    ask_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawApiError {
    code: i64,
}

pub struct BinanceFuturesClient {
    http: HttpClient,
}

impl BinanceFuturesClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Last traded price, or the bid/ask mid when no last price is reported.
    ///
    /// # Errors
    /// Returns [`FeedError::SymbolNotFound`] for unknown symbols and
    /// [`FeedError::PriceUnavailable`] when neither price is usable.
    pub async fn latest_price(&self, symbol: &Symbol) -> Result<Decimal> {
        let pair = symbol.concatenated();

        let ticker: RawTickerPrice = self
            .http
            .get("/fapi/v1/ticker/price", &[("symbol", pair.as_str())])
            .await
            .map_err(|e| map_symbol_error(e, symbol))?;

        if let Some(last) = parse_positive(ticker.price.as_deref())? {
            return Ok(last);
        }

        tracing::debug!(%symbol, "No last price, falling back to book mid");
        let book: RawBookTicker = self
            .http
            .get("/fapi/v1/ticker/bookTicker", &[("symbol", pair.as_str())])
            .await
            .map_err(|e| map_symbol_error(e, symbol))?;

        match (
            parse_positive(book.bid_price.as_deref())?,
            parse_positive(book.ask_price.as_deref())?,
        ) {
            (Some(bid), Some(ask)) => bid
                .checked_add(ask)
                .map(|sum| sum / Decimal::TWO)
                .ok_or_else(|| FeedError::Decode(format!("book mid of {bid}/{ask} overflows"))),
            _ => Err(FeedError::price_unavailable(symbol.to_string(), VENUE)),
        }
    }
}

#[async_trait]
impl PriceSource for BinanceFuturesClient {
    async fn fetch_price(&self, symbol: &Symbol) -> anyhow::Result<Decimal> {
        Ok(self.latest_price(symbol).await?)
    }

    fn name(&self) -> &str {
        VENUE
    }
}

fn map_symbol_error(err: FeedError, symbol: &Symbol) -> FeedError {
    if let FeedError::Api {
        status_code: 400,
        message,
    } = &err
    {
        let unknown = serde_json::from_str::<RawApiError>(message)
            .is_ok_and(|api| api.code == INVALID_SYMBOL_CODE);
        if unknown {
            return FeedError::symbol_not_found(symbol.to_string(), VENUE);
        }
    }
    err
}

fn parse_positive(raw: Option<&str>) -> Result<Option<Decimal>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = Decimal::from_str(raw)
        .map_err(|e| FeedError::Decode(format!("invalid price '{raw}': {e}")))?;
    Ok((value > Decimal::ZERO).then_some(value))
}
