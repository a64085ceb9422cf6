//! Simple Moving Average (SMA).
//!
//! Mean of the most recent closes over a lookback window. Defined once the
//! history holds at least `period` bars.

use super::CompensatedSum;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Mean of the last `period` closes, or `None` with fewer bars.
    pub fn latest(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < self.period {
            return None;
        }
        let mut sum = CompensatedSum::new();
        for bar in &bars[bars.len() - self.period..] {
            sum.add(bar.close);
        }
        Some(sum.value() / self.period as f64)
    }
}
