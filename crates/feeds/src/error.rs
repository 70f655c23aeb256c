//! Error types for price and FX feeds.

use thiserror::Error;

/// Errors that can occur when fetching prices or FX rates.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// API returned a non-success status.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The venue does not list the symbol.
    #[error("symbol {symbol} not found on {venue}")]
    SymbolNotFound { symbol: String, venue: String },

    /// The venue returned no usable price.
    #[error("no usable price for {symbol} on {venue}")]
    PriceUnavailable { symbol: String, venue: String },

    /// No usable FX rate for the pair.
    #[error("FX rate {base}->{quote} unavailable: {reason}")]
    RateUnavailable {
        base: String,
        quote: String,
        reason: String,
    },

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FeedError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    pub fn symbol_not_found(symbol: impl Into<String>, venue: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
            venue: venue.into(),
        }
    }

    pub fn price_unavailable(symbol: impl Into<String>, venue: impl Into<String>) -> Self {
        Self::PriceUnavailable {
            symbol: symbol.into(),
            venue: venue.into(),
        }
    }

    pub fn rate_unavailable(
        base: impl Into<String>,
        quote: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::RateUnavailable {
            base: base.into(),
            quote: quote.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the next poll may succeed without a config change.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
