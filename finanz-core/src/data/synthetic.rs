//! Synthetic price series for offline development.
//!
//! Produces a geometric random walk seeded from the symbol name, so the same
//! request always yields the same bars. Output is always tagged
//! [`DataSource::Synthetic`] and must never be mistaken for market data.

use super::provider::{check_range, finish_fetch, DataError, DataProvider, DataSource, FetchResult};
use crate::domain::Bar;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Daily log-return mean.
pub const RETURN_MEAN: f64 = 0.001;
/// Daily log-return standard deviation.
pub const RETURN_STD_DEV: f64 = 0.02;
/// Starting price for symbols without a known base.
pub const DEFAULT_BASE_PRICE: f64 = 1000.0;

const BASE_PRICES: &[(&str, f64)] = &[
    ("RELIANCE.NS", 2800.0),
    ("TCS.NS", 3500.0),
    ("INFY.NS", 1500.0),
    ("HDFCBANK.NS", 1600.0),
    ("ITC.NS", 450.0),
];

/// Starting price used for `symbol`.
pub fn base_price(symbol: &str) -> f64 {
    BASE_PRICES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|&(_, p)| p)
        .unwrap_or(DEFAULT_BASE_PRICE)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Generate weekday bars over `[start, end]` for `symbol`.
///
/// Deterministic: the RNG is seeded with the BLAKE3 hash of the symbol.
pub fn generate_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);
    let Ok(returns) = Normal::new(RETURN_MEAN, RETURN_STD_DEV) else {
        return Vec::new();
    };

    let base = base_price(symbol);
    let mut log_level = 0.0_f64;
    let mut bars = Vec::new();

    for current in start.iter_days().take_while(|d| *d <= end) {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }

        log_level += returns.sample(&mut rng);
        let close = base * log_level.exp();

        bars.push(Bar {
            date: current,
            open: round2(close * 0.99),
            high: round2(close * 1.02),
            low: round2(close * 0.98),
            close: round2(close),
            volume: rng.gen_range(1_000_000..10_000_000u64),
        });
    }

    bars
}

/// Provider that always succeeds with a synthetic series.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticProvider;

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        check_range(start, end)?;
        finish_fetch(
            symbol,
            generate_bars(symbol, start, end),
            start,
            end,
            DataSource::Synthetic,
        )
    }
}
