//! Trade: one executed buy or sell in the trade log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Side of an executed trade. Serialized as `"BUY"` / `"SELL"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A single fill at the bar's close. Always for a positive share count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: Side,
    pub shares: u64,
    pub price: f64,
}

impl Trade {
    /// Cash moved by the trade.
    pub fn notional(&self) -> f64 {
        self.shares as f64 * self.price
    }
}
