//! Hyperliquid perpetuals mid-price client.
//!
//! Hyperliquid quotes every perp in USDC and keys mids by coin, so only the
//! symbol's base is sent.

use crate::error::{FeedError, Result};
use crate::http::{ClientConfig, HttpClient};
use async_trait::async_trait;
use liq_sizer_core::{PriceSource, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Hyperliquid REST base URL.
pub const HYPERLIQUID_API_URL: &str = "https://api.hyperliquid.xyz";

const VENUE: &str = "hyperliquid";

pub struct HyperliquidPriceClient {
    http: HttpClient,
}

impl HyperliquidPriceClient {
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

    /// Fetches mid prices for every listed coin.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not a coin → price map.
    pub async fn all_mids(&self) -> Result<HashMap<String, String>> {
        self.http
            .post("/info", &serde_json::json!({"type": "allMids"}))
            .await
    }

    /// Mid price for the symbol's base coin.
    ///
    /// # Errors
    /// Returns [`FeedError::SymbolNotFound`] if the coin is not listed and
    /// [`FeedError::PriceUnavailable`] if its mid is not positive.
    pub async fn mid_price(&self, symbol: &Symbol) -> Result<Decimal> {
        let mids = self.all_mids().await?;
        let raw = mids
            .get(symbol.base())
            .ok_or_else(|| FeedError::symbol_not_found(symbol.to_string(), VENUE))?;

        let mid = Decimal::from_str(raw)
            .map_err(|e| FeedError::Decode(format!("invalid mid '{raw}': {e}")))?;
        if mid <= Decimal::ZERO {
            return Err(FeedError::price_unavailable(symbol.to_string(), VENUE));
        }
        Ok(mid)
    }
}

#[async_trait]
impl PriceSource for HyperliquidPriceClient {
    async fn fetch_price(&self, symbol: &Symbol) -> anyhow::Result<Decimal> {
        Ok(self.mid_price(symbol).await?)
    }

    fn name(&self) -> &str {
        VENUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_mids(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/info"))
            .and(body_json(serde_json::json!({"type": "allMids"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> HyperliquidPriceClient {
        HyperliquidPriceClient::new(&ClientConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_mid_price_by_base_coin() {
        let server = MockServer::start().await;
        mock_mids(
            &server,
            serde_json::json!({"BTC": "64123.5", "ETH": "3120.25", "@107": "1.0"}),
        )
        .await;

        let client = client(&server);
        let eth = Symbol::new("ETH/USDC").unwrap();
        assert_eq!(client.mid_price(&eth).await.unwrap(), dec!(3120.25));

        // Quote is ignored; Hyperliquid perps are all USDC-margined
        let btc = Symbol::new("BTC/USDT").unwrap();
        assert_eq!(client.mid_price(&btc).await.unwrap(), dec!(64123.5));
    }

    #[tokio::test]
    async fn test_unlisted_coin() {
        let server = MockServer::start().await;
        mock_mids(&server, serde_json::json!({"BTC": "64123.5"})).await;

        let doge = Symbol::new("DOGE/USDC").unwrap();
        let err = client(&server).mid_price(&doge).await.unwrap_err();
        assert!(matches!(err, FeedError::SymbolNotFound { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_unexpected_body_is_decode_error() {
        let server = MockServer::start().await;
        mock_mids(&server, serde_json::json!(["not", "a", "map"])).await;

        let btc = Symbol::new("BTC/USDC").unwrap();
        let err = client(&server).mid_price(&btc).await.unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)), "{err}");
    }

    #[tokio::test]
    async fn test_zero_mid_is_unavailable() {
        let server = MockServer::start().await;
        mock_mids(&server, serde_json::json!({"BTC": "0.0"})).await;

        let btc = Symbol::new("BTC/USDC").unwrap();
        let err = client(&server).mid_price(&btc).await.unwrap_err();
        assert!(matches!(err, FeedError::PriceUnavailable { .. }), "{err}");
    }
}
