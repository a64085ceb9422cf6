//! Run request and response payloads.
//!
//! `RunRequest` is what a caller (CLI, HTTP adapter, batch file) hands the
//! orchestrator; `RunResponse` is the trimmed result shape returned to it.

use chrono::NaiveDate;
use finanz_core::domain::{Trade, ValuePoint};
use finanz_core::strategy::StrategyKind;
use finanz_core::BacktestError;
use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceMetrics;
use crate::runner::BacktestResult;

/// Initial capital when a request does not specify one.
pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

fn default_initial_capital() -> f64 {
    DEFAULT_INITIAL_CAPITAL
}

/// A single backtest request.
///
/// Deserializing an unknown strategy name fails with the
/// [`BacktestError::UnknownStrategy`] message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

impl RunRequest {
    pub fn new(
        symbol: impl Into<String>,
        strategy: StrategyKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            strategy,
            start_date,
            end_date,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }

    pub fn with_capital(mut self, initial_capital: f64) -> Self {
        self.initial_capital = initial_capital;
        self
    }

    /// Same request with a different strategy.
    pub fn for_strategy(&self, strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    /// Check the request before any data is fetched.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.symbol.trim().is_empty() {
            return Err(BacktestError::invalid("symbol must not be empty"));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::invalid(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.start_date > self.end_date {
            return Err(BacktestError::invalid(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

/// Response payload: value history, trades, and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub value_history: Vec<ValuePoint>,
    pub trades: Vec<Trade>,
    pub metrics: PerformanceMetrics,
}

impl From<&BacktestResult> for RunResponse {
    fn from(result: &BacktestResult) -> Self {
        Self {
            value_history: result.value_history.clone(),
            trades: result.trades.clone(),
            metrics: result.metrics,
        }
    }
}

impl From<BacktestResult> for RunResponse {
    fn from(result: BacktestResult) -> Self {
        Self {
            value_history: result.value_history,
            trades: result.trades,
            metrics: result.metrics,
        }
    }
}
