use crate::sizing::Side;
use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    pub position: PositionConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub refresh_interval_secs: f64,
}

/// The position being sized. `entry_price` falls back to the live price when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    pub side: Side,
    pub equity: Decimal,
    pub leverage: Decimal,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub stop_loss_price: Option<Decimal>,
    #[serde(default = "default_risk_percent")]
    pub risk_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceVenue {
    #[default]
    Binance,
    Hyperliquid,
}

impl fmt::Display for PriceVenue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => f.write_str("binance"),
            Self::Hyperliquid => f.write_str("hyperliquid"),
        }
    }
}

impl FromStr for PriceVenue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "hyperliquid" => Ok(Self::Hyperliquid),
            other => bail!("unknown venue '{other}', expected binance or hyperliquid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub venue: PriceVenue,
    pub binance_url: String,
    pub hyperliquid_url: String,
    pub fx_url: String,
    /// Access key for the FX API, if it requires one
    pub fx_access_key: Option<String>,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Currency equity is denominated in
    pub quote_currency: String,
    /// Currency money values are converted to for display
    pub display_currency: String,
}

fn default_symbol() -> String {
    "BTC/USDT".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_risk_percent() -> Option<Decimal> {
    Some(Decimal::TWO)
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 2.0,
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            venue: PriceVenue::Binance,
            binance_url: "https://fapi.binance.com".to_string(),
            hyperliquid_url: "https://api.hyperliquid.xyz".to_string(),
            fx_url: "https://api.exchangerate.host".to_string(),
            fx_access_key: None,
            timeout_secs: 7,
            requests_per_second: 10,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            quote_currency: "USD".to_string(),
            display_currency: "USD".to_string(),
        }
    }
}

/// Shortest refresh interval the monitor accepts.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Longest refresh interval the monitor accepts (one day).
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(86_400);

impl MonitorConfig {
    /// Refresh interval clamped to [`MIN_REFRESH_INTERVAL`, `MAX_REFRESH_INTERVAL`].
    /// Non-finite or negative values fall back to the minimum.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        match Duration::try_from_secs_f64(self.refresh_interval_secs) {
            Ok(interval) => interval.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL),
            Err(_) if self.refresh_interval_secs > 0.0 => MAX_REFRESH_INTERVAL,
            Err(_) => MIN_REFRESH_INTERVAL,
        }
    }
}

impl AppConfig {
    /// Rejects settings the monitor cannot run with.
    ///
    /// Position numbers are left to the sizing calculator, which reports them
    /// on every tick.
    ///
    /// # Errors
    ///
    /// Returns an error for a refresh interval outside 1 ms to one day (or
    /// non-finite), zero timeout or rate, or empty currency codes.
    pub fn validate(&self) -> Result<()> {
        let interval = self.monitor.refresh_interval_secs;
        let in_range = Duration::try_from_secs_f64(interval)
            .is_ok_and(|d| (MIN_REFRESH_INTERVAL..=MAX_REFRESH_INTERVAL).contains(&d));
        if !in_range {
            bail!(
                "monitor.refresh_interval_secs must be between {} and {}, got {interval}",
                MIN_REFRESH_INTERVAL.as_secs_f64(),
                MAX_REFRESH_INTERVAL.as_secs_f64()
            );
        }
        if self.feeds.timeout_secs == 0 {
            bail!("feeds.timeout_secs must be positive");
        }
        if self.feeds.requests_per_second == 0 {
            bail!("feeds.requests_per_second must be positive");
        }
        if self.display.quote_currency.trim().is_empty()
            || self.display.display_currency.trim().is_empty()
        {
            bail!("display currencies must not be empty");
        }
        Ok(())
    }
}
