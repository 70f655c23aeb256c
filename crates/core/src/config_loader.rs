use crate::config::{AppConfig, PriceVenue};
use crate::sizing::Side;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/liq-sizer.toml";

/// Environment variables with this prefix override file values, with `__`
/// separating sections: `LIQ_POSITION__EQUITY=1000`.
pub const ENV_PREFIX: &str = "LIQ_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default path and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or required fields are missing.
    pub fn load() -> Result<AppConfig> {
        Self::load_with_overrides(DEFAULT_CONFIG_PATH, &ConfigOverrides::default())
    }

    /// Loads configuration by merging the file at `path` (TOML, or JSON by
    /// extension), `LIQ_` environment variables, and command-line overrides,
    /// in that order. A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged configuration cannot be extracted or
    /// fails [`AppConfig::validate`].
    pub fn load_with_overrides(
        path: impl AsRef<Path>,
        overrides: &ConfigOverrides,
    ) -> Result<AppConfig> {
        let path = path.as_ref();
        let file = if path.extension().is_some_and(|ext| ext == "json") {
            Figment::from(Json::file(path))
        } else {
            Figment::from(Toml::file(path))
        };

        let config: AppConfig = file
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "Configuration loaded");
        Ok(config)
    }
}

/// Values supplied on the command line. `None` fields leave the lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub monitor: MonitorOverrides,
    pub position: PositionOverrides,
    pub feeds: FeedsOverrides,
    pub display: DisplayOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PositionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<PriceVenue>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DisplayOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_currency: Option<String>,
}
