//! Portfolio simulator: deterministic replay of a strategy over a bar series.

use crate::domain::{Bar, Portfolio, MAX_POSITION_SHARES};
use crate::error::BacktestError;
use crate::strategy::{Signal, Strategy};
use tracing::debug;

/// Outcome of one simulation run.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub portfolio: Portfolio,
    /// Non-HOLD signals emitted by the strategy.
    pub signal_count: usize,
    /// BUY while holding, SELL while flat, or a BUY that could not afford a share.
    pub ignored_signals: usize,
}

impl Simulation {
    pub fn bar_count(&self) -> usize {
        self.portfolio.value_history.len()
    }
}

/// Reject inputs the simulator cannot run on.
///
/// Called before any portfolio state exists, so a rejected run leaves nothing
/// half-built behind.
pub fn validate_inputs(bars: &[Bar], initial_capital: f64) -> Result<(), BacktestError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(BacktestError::invalid(format!(
            "initial capital must be positive, got {initial_capital}"
        )));
    }
    if bars.is_empty() {
        return Err(BacktestError::invalid("bar series is empty"));
    }
    if let Some(bar) = bars.iter().find(|b| !b.is_sane()) {
        return Err(BacktestError::invalid(format!(
            "bar on {} has invalid prices",
            bar.date
        )));
    }
    let min_close = bars.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
    if initial_capital / min_close > MAX_POSITION_SHARES as f64 {
        return Err(BacktestError::invalid(format!(
            "initial capital {initial_capital} buys more than {MAX_POSITION_SHARES} shares at {min_close}"
        )));
    }
    if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(BacktestError::invalid(format!(
            "bar dates must be strictly increasing ({} followed by {})",
            pair[0].date, pair[1].date
        )));
    }
    Ok(())
}

/// Replay `strategy` over `bars` starting from `initial_capital` in cash.
///
/// At bar `i` the strategy sees exactly `bars[..=i]`. Every bar produces one
/// value-history entry, so `value_history.len() == bars.len()`.
pub fn simulate(
    bars: &[Bar],
    strategy: &dyn Strategy,
    initial_capital: f64,
) -> Result<Simulation, BacktestError> {
    validate_inputs(bars, initial_capital)?;

    let mut portfolio = Portfolio::new(initial_capital);
    let mut signal_count = 0;
    let mut ignored_signals = 0;

    for i in 0..bars.len() {
        let bar = &bars[i];
        let signal = strategy.decide(&bars[..=i]);

        match signal {
            Signal::Buy => {
                signal_count += 1;
                match portfolio.buy(bar) {
                    Some(trade) => debug!(
                        date = %trade.date,
                        shares = trade.shares,
                        price = trade.price,
                        "buy"
                    ),
                    None => ignored_signals += 1,
                }
            }
            Signal::Sell => {
                signal_count += 1;
                match portfolio.sell(bar) {
                    Some(trade) => debug!(
                        date = %trade.date,
                        shares = trade.shares,
                        price = trade.price,
                        "sell"
                    ),
                    None => ignored_signals += 1,
                }
            }
            Signal::Hold => {}
        }

        portfolio.mark(bar);
    }

    debug!(
        strategy = strategy.name(),
        bars = bars.len(),
        trades = portfolio.trade_log.len(),
        signal_count,
        ignored_signals,
        "simulation complete"
    );

    Ok(Simulation {
        portfolio,
        signal_count,
        ignored_signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::indicators::make_bars;
    use crate::strategy::{BuyAndHold, Crossover, ExternalSignal};
    use std::sync::Arc;

    fn values(sim: &Simulation) -> Vec<f64> {
        sim.portfolio.value_history.iter().map(|p| p.value).collect()
    }

    #[test]
    fn buy_and_hold_doubles() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 200.0]);
        let sim = simulate(&bars, &BuyAndHold, 1_000.0).unwrap();

        assert_eq!(sim.portfolio.trade_log.len(), 1);
        let trade = &sim.portfolio.trade_log[0];
        assert_eq!(trade.side, Side::Buy);
        assert_eq!(trade.shares, 10);
        assert_eq!(trade.price, 100.0);
        assert_eq!(values(&sim), vec![1_000.0, 1_000.0, 1_000.0, 2_000.0]);
    }

    #[test]
    fn empty_series_is_invalid() {
        let err = simulate(&[], &BuyAndHold, 1_000.0).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));
    }

    #[test]
    fn zero_or_negative_capital_is_invalid() {
        let bars = make_bars(&[100.0]);
        for capital in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = simulate(&bars, &BuyAndHold, capital).unwrap_err();
            assert!(matches!(err, BacktestError::InvalidInput(_)), "capital={capital}");
        }
    }

    #[test]
    fn capital_beyond_position_cap_is_invalid() {
        let bars = make_bars(&[1e-300, 2e-300]);
        let err = simulate(&bars, &BuyAndHold, 1e300).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));

        let bars = make_bars(&[0.5, 1.0]);
        let sim = simulate(&bars, &BuyAndHold, 1e9).unwrap();
        assert_eq!(sim.portfolio.shares_held, 2_000_000_000);
        assert_eq!(values(&sim), vec![1e9, 2e9]);
    }

    #[test]
    fn unordered_dates_are_invalid() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        bars.swap(1, 2);
        let err = simulate(&bars, &BuyAndHold, 1_000.0).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn duplicate_dates_are_invalid() {
        let mut bars = make_bars(&[100.0, 101.0]);
        bars[1].date = bars[0].date;
        assert!(simulate(&bars, &BuyAndHold, 1_000.0).is_err());
    }

    #[test]
    fn insufficient_cash_buy_is_noop() {
        let bars = make_bars(&[500.0, 400.0]);
        let sim = simulate(&bars, &BuyAndHold, 100.0).unwrap();
        assert!(sim.portfolio.trade_log.is_empty());
        assert_eq!(values(&sim), vec![100.0, 100.0]);
        assert_eq!(sim.ignored_signals, 1);
    }

    #[test]
    fn never_buying_is_flat_at_initial_capital() {
        let bars = make_bars(&[10.0, 20.0, 5.0, 30.0]);
        let hold = ExternalSignal::new(Arc::new(|_: &[Bar]| Signal::Hold));
        let sim = simulate(&bars, &hold, 5_000.0).unwrap();
        assert!(sim.portfolio.trade_log.is_empty());
        assert!(values(&sim).iter().all(|&v| v == 5_000.0));
        assert_eq!(sim.signal_count, 0);
    }

    #[test]
    fn sell_while_flat_and_buy_while_holding_are_ignored() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        let script = [Signal::Sell, Signal::Buy, Signal::Buy, Signal::Sell];
        let source = move |history: &[Bar]| script[history.len() - 1];
        let strategy = ExternalSignal::new(Arc::new(source));
        let sim = simulate(&bars, &strategy, 100.0).unwrap();

        let sides: Vec<Side> = sim.portfolio.trade_log.iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell]);
        assert_eq!(sim.signal_count, 4);
        assert_eq!(sim.ignored_signals, 2);
        // 9 shares bought at 11 (1 cash left), sold at 13.
        assert_eq!(sim.portfolio.cash, 1.0 + 9.0 * 13.0);
    }

    #[test]
    fn strategy_sees_only_history_prefix() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let expected_dates: Vec<_> = bars.iter().map(|b| b.date).collect();
        let source = move |history: &[Bar]| {
            let last = history.last().unwrap();
            assert_eq!(last.date, expected_dates[history.len() - 1]);
            Signal::Hold
        };
        let strategy = ExternalSignal::new(Arc::new(source));
        let sim = simulate(&bars, &strategy, 100.0).unwrap();
        assert_eq!(sim.bar_count(), bars.len());
    }

    #[test]
    fn crossover_round_trip() {
        // Flat, then a rally (short crosses above), then a slump (crosses below).
        let mut closes = vec![10.0; 6];
        closes.extend([12.0, 14.0, 16.0, 18.0]);
        closes.extend([12.0, 8.0, 6.0, 5.0]);
        let bars = make_bars(&closes);
        let strategy = Crossover::new(2, 5).unwrap();
        let sim = simulate(&bars, &strategy, 1_000.0).unwrap();

        let sides: Vec<Side> = sim.portfolio.trade_log.iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell]);
        assert_eq!(sim.bar_count(), closes.len());
    }

    #[test]
    fn value_equals_cash_plus_position_every_bar() {
        let closes: Vec<f64> = (0..120).map(|i| 50.0 + (i as f64 * 0.2).sin() * 20.0).collect();
        let bars = make_bars(&closes);
        let strategy = Crossover::new(3, 10).unwrap();
        let sim = simulate(&bars, &strategy, 10_000.0).unwrap();
        let last = sim.portfolio.value_history.last().unwrap();
        let expected = sim.portfolio.cash + sim.portfolio.shares_held as f64 * closes[119];
        assert_eq!(last.value, expected);
        assert!(sim.portfolio.cash >= 0.0);
    }
}
