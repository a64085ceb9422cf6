//! Portfolio: cash, the single open position, trade log and value history.

use super::bar::Bar;
use super::trade::{Side, Trade};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Largest position the portfolio will hold (2^53). Share counts up to this
/// bound convert to `f64` exactly, so the accounting identity stays exact.
pub const MAX_POSITION_SHARES: u64 = 1 << 53;

/// Mark-to-market portfolio value at one bar's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Portfolio state for one backtest run.
///
/// The accounting identity must hold at every bar:
/// `value == cash + shares_held * close`. A buy is only executed while flat
/// and a sell always closes the full position.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub cash: f64,
    pub shares_held: u64,
    pub trade_log: Vec<Trade>,
    pub value_history: Vec<ValuePoint>,
}

impl Portfolio {
    /// Callers validate `initial_capital > 0` before constructing state.
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            shares_held: 0,
            trade_log: Vec::new(),
            value_history: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.shares_held == 0
    }

    /// Total equity at `price` = cash + position market value.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.shares_held as f64 * price
    }

    /// Spend as much cash as possible on whole shares at the bar's close.
    ///
    /// Returns `None` without touching state when already holding or when the
    /// cash cannot buy a single share. The order is capped at
    /// [`MAX_POSITION_SHARES`]; any remainder stays in cash.
    pub fn buy(&mut self, bar: &Bar) -> Option<&Trade> {
        if !self.is_flat() {
            return None;
        }
        let price = bar.close;
        let affordable = (self.cash / price).floor();
        if affordable < 1.0 {
            return None;
        }
        let mut shares = affordable.min(MAX_POSITION_SHARES as f64) as u64;
        // floor(cash / price) can round up by one ulp; never overspend.
        if shares > 0 && shares as f64 * price > self.cash {
            shares -= 1;
        }
        if shares == 0 {
            return None;
        }
        self.cash -= shares as f64 * price;
        self.shares_held = shares;
        self.trade_log.push(Trade {
            date: bar.date,
            side: Side::Buy,
            shares,
            price,
        });
        self.trade_log.last()
    }

    /// Close the full position at the bar's close. `None` when flat.
    pub fn sell(&mut self, bar: &Bar) -> Option<&Trade> {
        if self.is_flat() {
            return None;
        }
        let shares = self.shares_held;
        self.cash += shares as f64 * bar.close;
        self.shares_held = 0;
        self.trade_log.push(Trade {
            date: bar.date,
            side: Side::Sell,
            shares,
            price: bar.close,
        });
        self.trade_log.last()
    }

    /// Append the bar's mark-to-market value to the history and return it.
    pub fn mark(&mut self, bar: &Bar) -> f64 {
        let value = self.equity(bar.close);
        self.value_history.push(ValuePoint {
            date: bar.date,
            value,
        });
        value
    }
}
