//! Validation errors raised by the sizing calculator.

use thiserror::Error;

/// Errors from [`crate::sizing::compute`].
///
/// Both variants are configuration mistakes, not transient conditions, and are
/// surfaced to the caller without retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizingError {
    /// Non-positive price, equity or leverage, or an out-of-range value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stop loss is zero-distance or on the wrong side of entry.
    #[error("invalid stop loss: {0}")]
    InvalidStopLoss(String),
}

impl SizingError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_stop_loss(msg: impl Into<String>) -> Self {
        Self::InvalidStopLoss(msg.into())
    }
}

/// A symbol that is not in `BASE/QUOTE` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid symbol '{0}': expected BASE/QUOTE, e.g. BTC/USDT")]
pub struct InvalidSymbol(pub String);

/// Result type for sizing operations.
pub type Result<T> = std::result::Result<T, SizingError>;
