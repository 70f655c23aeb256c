//! Currency conversion rates from exchangerate.host.
//!
//! Converting a currency to itself never touches the network.

use crate::error::{FeedError, Result};
use crate::http::{ClientConfig, HttpClient};
use async_trait::async_trait;
use liq_sizer_core::FxSource;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

/// exchangerate.host base URL.
pub const EXCHANGE_RATE_HOST_URL: &str = "https://api.exchangerate.host";

/// Both response shapes are accepted: `rates: {"EUR": 0.92}` and the newer
/// `quotes: {"USDEUR": 0.92}`.
#[derive(Debug, Deserialize)]
struct RawRatesResponse {
    success: Option<bool>,
    rates: Option<HashMap<String, serde_json::Number>>,
    quotes: Option<HashMap<String, serde_json::Number>>,
    error: Option<serde_json::Value>,
}

pub struct ExchangeRateClient {
    http: HttpClient,
    access_key: Option<String>,
}

impl ExchangeRateClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            access_key: None,
        })
    }

    #[must_use]
    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Rate converting one unit of `base` into `quote`.
    ///
    /// # Errors
    /// Returns [`FeedError::RateUnavailable`] when the API reports failure or
    /// omits a positive rate for the pair.
    pub async fn rate(&self, base: &str, quote: &str) -> Result<Decimal> {
        let base = base.trim().to_ascii_uppercase();
        let quote = quote.trim().to_ascii_uppercase();
        if base == quote {
            return Ok(Decimal::ONE);
        }

        let mut query = vec![("base", base.as_str()), ("symbols", quote.as_str())];
        if let Some(key) = &self.access_key {
            query.push(("access_key", key.as_str()));
        }

        let response: RawRatesResponse = self.http.get("/latest", &query).await?;

        if response.success == Some(false) {
            let reason = response
                .error
                .map_or_else(|| "request unsuccessful".to_string(), |e| e.to_string());
            return Err(FeedError::rate_unavailable(base, quote, reason));
        }

        let number = response
            .rates
            .as_ref()
            .and_then(|rates| rates.get(&quote))
            .or_else(|| {
                response
                    .quotes
                    .as_ref()
                    .and_then(|quotes| quotes.get(&format!("{base}{quote}")))
            })
            .ok_or_else(|| FeedError::rate_unavailable(&base, &quote, "missing rate"))?;

        let rate = parse_number(number)?;
        if rate <= Decimal::ZERO {
            return Err(FeedError::rate_unavailable(base, quote, format!("non-positive rate {rate}")));
        }
        Ok(rate)
    }
}

#[async_trait]
impl FxSource for ExchangeRateClient {
    async fn fetch_rate(&self, base: &str, quote: &str) -> anyhow::Result<Decimal> {
        Ok(self.rate(base, quote).await?)
    }
}

fn parse_number(number: &serde_json::Number) -> Result<Decimal> {
    let raw = number.to_string();
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|e| FeedError::Decode(format!("invalid rate '{raw}': {e}")))
}
