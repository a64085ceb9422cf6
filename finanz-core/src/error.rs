//! Error taxonomy surfaced to callers of a backtest.
//!
//! All three variants are user-visible and non-fatal to the process. Input and
//! strategy errors are raised before any portfolio state is constructed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown strategy '{0}' (valid: crossover, buy-and-hold, external-signal)")]
    UnknownStrategy(String),

    #[error("data unavailable for '{symbol}': {reason}")]
    DataUnavailable { symbol: String, reason: String },
}

impl BacktestError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
