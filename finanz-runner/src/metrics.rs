//! Performance metrics: pure functions that compute run statistics.
//!
//! Every metric is a pure function: value history and/or trade log in, scalar
//! out. Computation runs at full precision; only [`PerformanceMetrics`]
//! rounds, for presentation.

use finanz_core::domain::{Trade, ValuePoint};
use serde::{Deserialize, Serialize};

/// Trading days per year, used to annualize the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
///
/// `total_return` and `max_drawdown` are percentages; all values are rounded
/// to 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub num_trades: usize,
    pub final_value: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from a value history and trade log.
    pub fn compute(value_history: &[ValuePoint], trades: &[Trade], initial_capital: f64) -> Self {
        let values: Vec<f64> = value_history.iter().map(|p| p.value).collect();
        Self {
            total_return: round2(total_return_pct(&values, initial_capital)),
            sharpe_ratio: round2(sharpe_ratio(&values)),
            max_drawdown: round2(max_drawdown_pct(&values, initial_capital)),
            num_trades: trades.len(),
            final_value: round2(values.last().copied().unwrap_or(initial_capital)),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Round to 2 decimal places. Values that round to zero are reported as `+0.0`.
pub fn round2(x: f64) -> f64 {
    let r = (x * 100.0).round() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Total return in percent: (last - initial) / initial * 100.
///
/// Returns 0.0 for an empty history or non-positive capital.
pub fn total_return_pct(values: &[f64], initial_capital: f64) -> f64 {
    match values.last() {
        Some(&last) if initial_capital > 0.0 => (last - initial_capital) / initial_capital * 100.0,
        _ => 0.0,
    }
}

/// Per-bar simple returns `(v[i] - v[i-1]) / v[i-1]`.
///
/// Empty for fewer than 2 values.
pub fn returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Online mean and variance (Welford).
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::default();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}

/// Annualized Sharpe ratio: mean(r) / std(r) * sqrt(252), risk-free rate 0.
///
/// Returns 0.0 with fewer than 2 returns or zero variance.
pub fn sharpe_ratio(values: &[f64]) -> f64 {
    let stats: RunningStats = returns(values).into_iter().collect();
    if stats.count() < 2 {
        return 0.0;
    }
    let std = stats.std_dev();
    if std < 1e-15 {
        return 0.0;
    }
    stats.mean() / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Maximum drawdown in percent (zero or negative).
///
/// Drawdown at bar i is `cum[i] - max(cum[..=i])` with
/// `cum[i] = (v[i] - initial) / initial`; the result is the minimum times 100.
pub fn max_drawdown_pct(values: &[f64], initial_capital: f64) -> f64 {
    if values.is_empty() || initial_capital <= 0.0 {
        return 0.0;
    }
    let mut running_max = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        let cum = (v - initial_capital) / initial_capital;
        running_max = running_max.max(cum);
        worst = worst.min(cum - running_max);
    }
    worst * 100.0
}
