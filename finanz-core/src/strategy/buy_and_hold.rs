//! Buy-and-hold: enter on the first bar with all capital, never exit.

use super::{Signal, Strategy};
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy-and-hold"
    }

    fn decide(&self, history: &[Bar]) -> Signal {
        if history.len() == 1 {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}
