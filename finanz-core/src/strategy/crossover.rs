//! Moving average crossover: trade the regime of a short vs. long SMA.
//!
//! BUY while the short mean is above the long mean, SELL while it is below.
//! Because the simulator only buys when flat and only sells when holding, the
//! portfolio changes exactly when the two means cross.

use super::{Signal, Strategy};
use crate::domain::Bar;
use crate::error::BacktestError;
use crate::indicators::Sma;

/// Moving average crossover strategy over closing prices.
///
/// Bars with fewer than `long_window` prior bars never signal.
#[derive(Debug, Clone)]
pub struct Crossover {
    short: Sma,
    long: Sma,
}

impl Crossover {
    pub const DEFAULT_SHORT_WINDOW: usize = 50;
    pub const DEFAULT_LONG_WINDOW: usize = 200;

    pub fn new(short_window: usize, long_window: usize) -> Result<Self, BacktestError> {
        if short_window == 0 {
            return Err(BacktestError::invalid("crossover short window must be >= 1"));
        }
        if long_window <= short_window {
            return Err(BacktestError::invalid(format!(
                "crossover long window ({long_window}) must exceed short window ({short_window})"
            )));
        }
        Ok(Self {
            short: Sma::new(short_window),
            long: Sma::new(long_window),
        })
    }

    pub fn short_window(&self) -> usize {
        self.short.period()
    }

    pub fn long_window(&self) -> usize {
        self.long.period()
    }
}

impl Default for Crossover {
    fn default() -> Self {
        Self {
            short: Sma::new(Self::DEFAULT_SHORT_WINDOW),
            long: Sma::new(Self::DEFAULT_LONG_WINDOW),
        }
    }
}

impl Strategy for Crossover {
    fn name(&self) -> &str {
        "crossover"
    }

    fn warmup_bars(&self) -> usize {
        self.long.period()
    }

    fn decide(&self, history: &[Bar]) -> Signal {
        // Current bar index is len - 1; it needs `long` bars before it.
        if history.len() <= self.warmup_bars() {
            return Signal::Hold;
        }

        let (Some(short), Some(long)) = (self.short.latest(history), self.long.latest(history))
        else {
            return Signal::Hold;
        };

        if short > long {
            Signal::Buy
        } else if short < long {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn rejects_bad_windows() {
        assert!(Crossover::new(0, 5).is_err());
        assert!(Crossover::new(5, 5).is_err());
        assert!(Crossover::new(10, 3).is_err());
        assert!(Crossover::new(2, 5).is_ok());
    }

    #[test]
    fn default_windows_are_50_200() {
        let strategy = Crossover::default();
        assert_eq!(strategy.short_window(), 50);
        assert_eq!(strategy.long_window(), 200);
        assert_eq!(strategy.warmup_bars(), 200);
    }

    #[test]
    fn holds_during_warmup() {
        let closes: Vec<f64> = (1..=5).map(|i| i as f64 * 10.0).collect();
        let bars = make_bars(&closes);
        let strategy = Crossover::new(2, 4).unwrap();
        // Rising prices put short above long as soon as both exist,
        // but index 3 has only 3 prior bars.
        for end in 1..=4 {
            assert_eq!(strategy.decide(&bars[..end]), Signal::Hold, "end={end}");
        }
        assert_eq!(strategy.decide(&bars[..5]), Signal::Buy);
    }

    #[test]
    fn sells_when_short_mean_drops_below() {
        let bars = make_bars(&[10.0, 10.0, 10.0, 10.0, 10.0, 5.0]);
        let strategy = Crossover::new(2, 4).unwrap();
        assert_eq!(strategy.decide(&bars), Signal::Sell);
    }

    #[test]
    fn flat_prices_hold() {
        let bars = make_bars(&[10.0; 12]);
        let strategy = Crossover::new(3, 6).unwrap();
        for end in 1..=bars.len() {
            assert_eq!(strategy.decide(&bars[..end]), Signal::Hold);
        }
    }
}
